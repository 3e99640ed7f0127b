//! Configuration errors. These are the only errors surfaced to callers as
//! hard failures.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid environment variable {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
