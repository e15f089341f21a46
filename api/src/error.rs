use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid lifecycle config: {0}")]
    InvalidConfig(String),

    #[error("invalid deployment: {0}")]
    InvalidDeployment(String),

    #[error("invalid launch override: {0}")]
    InvalidOverride(String),

    #[error("invalid settings: {0}")]
    Settings(String),
}
