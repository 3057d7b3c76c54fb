use thiserror::Error;

/// Faults detected before any individual is processed. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown behavioral policy '{0}'")]
    UnknownPolicy(String),

    #[error("{policy}: {field} {reason}")]
    InvalidParameter {
        policy: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("invalid age range: from ({from}) must be <= to ({to})")]
    InvalidAgeRange { from: f64, to: f64 },
}
