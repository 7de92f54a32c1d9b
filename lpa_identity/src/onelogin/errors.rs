use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum OneLoginError {
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Token endpoint failure, including a rejected ID token or nonce mismatch.
    #[error("Token exchange error: {0}")]
    Exchange(String),

    #[error("Fetch user info error: {0}")]
    UserInfo(String),

    #[error("Identity claim parse error: {0}")]
    ClaimParse(String),

    /// An `error` parameter other than `access_denied` on the redirect.
    #[error("Provider returned error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
