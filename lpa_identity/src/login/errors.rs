use thiserror::Error;

use crate::context::Role;
use crate::onelogin::OneLoginError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::utils::UtilError;
use crate::vendor::VendorError;

/// Errors from starting, completing or leaving a login.
#[derive(Debug, Error, Clone)]
pub enum LoginError {
    #[error("Session error: {0}")]
    Session(SessionError),

    #[error("Identity provider error: {0}")]
    OneLogin(OneLoginError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Utils error: {0}")]
    Utils(UtilError),

    #[error("Identity vendor error: {0}")]
    Vendor(VendorError),

    /// The in-flight login carries no nonce, so the ID token cannot be bound to it.
    #[error("In-flight login has no nonce")]
    MissingNonce,

    #[error("No case reference for {0}")]
    MissingCaseReference(Role),

    /// The request named a case or session other than the one the browser
    /// has been granted.
    #[error("Case reference does not match the {0} session")]
    CaseMismatch(Role),

    #[error("{0} does not confirm their identity")]
    IdentityNotRequired(Role),

    #[error("No identity vendor configured")]
    NoVendor,

    #[error("Unknown role: {0}")]
    InvalidRole(String),
}

impl LoginError {
    /// True for failures caused by the request rather than by this service.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::MissingCaseReference(_)
                | Self::CaseMismatch(_)
                | Self::IdentityNotRequired(_)
                | Self::InvalidRole(_)
        )
    }

    pub fn is_csrf(&self) -> bool {
        matches!(self, Self::Session(SessionError::CsrfToken(_)))
    }
}

impl From<SessionError> for LoginError {
    fn from(err: SessionError) -> Self {
        let error = Self::Session(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<OneLoginError> for LoginError {
    fn from(err: OneLoginError) -> Self {
        let error = Self::OneLogin(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<StorageError> for LoginError {
    fn from(err: StorageError) -> Self {
        let error = Self::Storage(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<UtilError> for LoginError {
    fn from(err: UtilError) -> Self {
        let error = Self::Utils(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<VendorError> for LoginError {
    fn from(err: VendorError) -> Self {
        let error = Self::Vendor(err);
        tracing::error!("{}", error);
        error
    }
}
