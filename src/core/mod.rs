//! Core rules: access predicate, status derivation, ordering, patches
//!
//! Everything here is pure or near-pure and unit-tested in isolation from
//! HTTP and MongoDB. The service layer wires these rules to the store.

pub mod access;
pub mod order;
pub mod patch;
pub mod status;

pub use access::CallerContext;
pub use order::next_order;
pub use patch::{InstancePatch, ProjectPatch};
pub use status::{derive_status, InstanceStatus, ProjectStatus};
