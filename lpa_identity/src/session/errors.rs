use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// No value of the expected kind in the cookie scope.
    #[error("missing {0} session")]
    Missing(String),

    /// A value of the expected kind that fails its own validity check.
    #[error("{0} session invalid")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session kind not registered: {0}")]
    Unregistered(String),

    #[error("CSRF token error: {0}")]
    CsrfToken(String),

    #[error("Header error: {0}")]
    HeaderError(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
