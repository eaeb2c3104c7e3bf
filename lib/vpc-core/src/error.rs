use thiserror::Error;
use vpc_api::backend::vpc::PathError;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Network config not found: {0}")]
    NetworkConfigNotFound(String),

    #[error("No default network config registered")]
    NoDefaultNetworkConfig,

    #[error("Multiple default network configs registered: {0:?}")]
    MultipleDefaultNetworkConfigs(Vec<String>),

    #[error("Invalid network configuration {name}: {reason}")]
    InvalidConfiguration { name: String, reason: String },

    #[error(transparent)]
    InvalidPath(#[from] PathError),
}
