//! Authentication and authorization for Stagetrack
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - The manager/user role model that gates every write

pub mod jwt;
pub mod password;
pub mod roles;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use roles::Role;
