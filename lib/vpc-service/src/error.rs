use thiserror::Error;
use vpc_backend::BackendError;
use vpc_core::{CoreError, Retryable};

pub type Result<T> = std::result::Result<T, VpcError>;

#[derive(Error, Debug)]
pub enum VpcError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Namespace {0} not found")]
    NamespaceNotFound(String),

    #[error("{kind} {name} has no UID")]
    MissingUid { kind: &'static str, name: String },

    #[error("VPC of namespace {shared} requested by {namespace} is not created yet")]
    SharedVpcNotReady { namespace: String, shared: String },

    #[error("Realization of {path} failed: {message}")]
    Realization { path: String, message: String },

    #[error("Realization of {path} not complete after {attempts} attempts")]
    RealizationTimeout { path: String, attempts: u32 },

    #[error("Rollback of {path} failed ({rollback}) after: {cause}")]
    RollbackFailed {
        path: String,
        cause: Box<VpcError>,
        rollback: BackendError,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl VpcError {
    /// Whether another reconciliation attempt can succeed without a change
    /// to the declared objects
    pub fn is_retryable(&self) -> bool {
        match self {
            VpcError::Core(CoreError::InvalidConfiguration { .. })
            | VpcError::Core(CoreError::InvalidPath(_)) => false,
            VpcError::Backend(e) => !e.is_bad_request(),
            _ => true,
        }
    }
}

impl Retryable for VpcError {
    fn is_transient(&self) -> bool {
        match self {
            VpcError::Backend(e) => e.is_transient(),
            _ => false,
        }
    }
}
