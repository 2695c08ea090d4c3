//! Configuration for Stagetrack
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Stagetrack - project tracking API
#[derive(Parser, Debug, Clone)]
#[command(name = "stagetrack")]
#[command(about = "Project tracking API with stage graphs and derived status")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "stagetrack")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (fixed insecure JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate the configuration before startup
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required outside dev mode".into()),
                Some(s) if s.len() < 16 => {
                    return Err("JWT_SECRET must be at least 16 characters".into())
                }
                Some(_) => {}
            }
        }
        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        // --dev-mode is a bare flag; it takes no value
        Args::parse_from(["stagetrack", "--dev-mode"])
    }

    #[test]
    fn test_dev_mode_needs_no_secret() {
        let args = base_args();
        assert!(args.dev_mode);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = Args::parse_from(["stagetrack"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let args = Args::parse_from(["stagetrack", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_valid_production_config() {
        let args = Args::parse_from(["stagetrack", "--jwt-secret", "a-long-enough-secret"]);
        assert!(args.validate().is_ok());
    }
}
