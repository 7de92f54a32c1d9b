//! lpa_identity - Identity, session and case-linking services for the LPA service
//!
//! Logs donors, certificate providers and attorneys in with the identity
//! provider, reads their verified identity, and links the result to the
//! case they are acting on. Works on plain `http` types so any web
//! framework can drive it.

mod config;
mod context;
mod login;
mod onelogin;
mod session;
mod storage;
mod utils;
mod vendor;

use std::sync::Arc;

pub use config::{APP_PUBLIC_URL, AUTH_REDIRECT_PATH};

pub use context::{AppContext, Lang, Role};

pub use login::{
    CallbackOutcome, CallbackQuery, LoginError, LoginFlow, LoginQuery, VendorCallbackQuery,
    VendorStart,
};

pub use onelogin::{
    CORE_IDENTITY_CLAIM, Endpoints, IdentityClaimResult, IdentityProvider, OneLoginClient,
    OneLoginConfig, OneLoginError, SigningKey, TokenResponse, UserInfo, parse_identity_claim,
};

pub use session::{
    AttorneySession, AuthenticatedSession, CSRF_FORM_FIELD, CSRF_HEADER, CertificateProviderSession,
    CookieSpec, CsrfGuard, CsrfSession, CsrfState, DonorSession, InFlightLoginSession,
    SESSION_SECRET, SessionCodec, SessionError, SessionKind, SessionPayload, SessionRegistry,
    SessionValue, ShareCodeSession, YotiSession, is_state_changing, submitted_token,
};

pub use storage::{
    CacheData, CacheStore, CaseRecord, CaseStore, InMemoryCacheStore, InMemoryCaseStore,
    PostgresCaseStore, RedisCacheStore, SqliteCaseStore, StorageError, cache_store_from_env,
    case_store_from_env,
};

pub use utils::{Clock, RandomString, SystemClock, SystemRandomString, UtilError};

pub use vendor::{IdentityVendor, VendorError, YotiClient, YotiConfig};

/// The long-lived objects a web layer needs, sharing one session codec.
pub struct IdentityServices {
    pub login: Arc<LoginFlow>,
    pub csrf: Arc<CsrfGuard>,
}

/// Builds the services from the environment.
///
/// Connects the stores, resolves the provider endpoints and checks that
/// every session kind has a cookie scope. Any failure here is fatal. The
/// document-scanning vendor is optional and only wired when configured.
pub async fn init() -> Result<IdentityServices, Box<dyn std::error::Error + Send + Sync>> {
    let codec = Arc::new(SessionCodec::new(
        &SESSION_SECRET,
        SessionRegistry::standard(),
    )?);

    let cases = case_store_from_env().await?;
    let consumed = cache_store_from_env().await?;
    let provider = OneLoginClient::from_config(OneLoginConfig::from_env()?).await?;

    let random: Arc<dyn RandomString> = Arc::new(SystemRandomString);
    let mut login = LoginFlow::new(
        Arc::new(provider),
        codec.clone(),
        cases,
        consumed,
        APP_PUBLIC_URL.as_str(),
    )
    .with_random(random.clone());

    match YotiConfig::from_env()? {
        Some(config) => login = login.with_vendor(Arc::new(YotiClient::new(config)?)),
        None => tracing::info!("YOTI_CLIENT_SDK_ID not set, identity with Yoti is disabled"),
    }

    Ok(IdentityServices {
        login: Arc::new(login),
        csrf: Arc::new(CsrfGuard::new(codec, random)),
    })
}
