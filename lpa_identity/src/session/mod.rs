mod codec;
mod config;
mod csrf;
mod errors;
mod types;

pub use codec::{CookieSpec, SessionCodec, SessionRegistry};
pub use config::SESSION_SECRET;
pub use csrf::{
    CSRF_FORM_FIELD, CSRF_HEADER, CsrfGuard, CsrfState, is_state_changing, submitted_token,
};
pub use errors::SessionError;
pub use types::{
    AttorneySession, AuthenticatedSession, CertificateProviderSession, CsrfSession, DonorSession,
    InFlightLoginSession, SessionKind, SessionPayload, SessionValue, ShareCodeSession, YotiSession,
};

pub(crate) use config::env_or;
