use thiserror::Error;

pub type DecisionResult<T> = Result<T, DecisionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown arm: {0}")]
    UnknownArm(String),

    #[error("Policy requires at least one arm")]
    EmptyArmSet,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for DecisionError {
    fn from(err: config::ConfigError) -> Self {
        DecisionError::Config(err.to_string())
    }
}
