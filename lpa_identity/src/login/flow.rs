use http::HeaderMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::context::{AppContext, Lang, Role};
use crate::onelogin::IdentityProvider;
use crate::session::{InFlightLoginSession, SessionCodec, SessionError, SessionKind};
use crate::storage::{CacheStore, CaseStore};
use crate::utils::{Clock, RandomString, SystemClock, SystemRandomString, UtilError};
use crate::vendor::IdentityVendor;

use super::binding::BoundCase;
use super::errors::LoginError;
use super::types::{CallbackQuery, LoginQuery};

const MIN_TOKEN_LEN: usize = 12;

/// Drives a login from the first redirect to the linked session.
///
/// Built once at startup and shared between requests.
pub struct LoginFlow {
    pub(super) provider: Arc<dyn IdentityProvider>,
    pub(super) codec: Arc<SessionCodec>,
    pub(super) cases: Arc<dyn CaseStore>,
    pub(super) consumed: Arc<dyn CacheStore>,
    pub(super) random: Arc<dyn RandomString>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) vendor: Option<Arc<dyn IdentityVendor>>,
    pub(super) public_url: String,
}

impl LoginFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        codec: Arc<SessionCodec>,
        cases: Arc<dyn CaseStore>,
        consumed: Arc<dyn CacheStore>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            codec,
            cases,
            consumed,
            random: Arc::new(SystemRandomString),
            clock: Arc::new(SystemClock),
            vendor: None,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomString>) -> Self {
        self.random = random;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enables the document-check journey.
    pub fn with_vendor(mut self, vendor: Arc<dyn IdentityVendor>) -> Self {
        self.vendor = Some(vendor);
        self
    }

    pub fn codec(&self) -> &Arc<SessionCodec> {
        &self.codec
    }

    pub(super) fn token(&self) -> Result<String, LoginError> {
        let token = self.random.generate()?;
        if token.len() < MIN_TOKEN_LEN {
            return Err(UtilError::Crypto("Generated token is too short".to_string()).into());
        }
        Ok(token)
    }

    /// Records the login in the `params` cookie and returns the provider URL
    /// to redirect to.
    ///
    /// The case comes only from what the browser has been granted, its
    /// bound case. `lpaId` and `sessionId` in the query may restate it but
    /// never choose it, and a differing value is refused.
    /// Identity is only requested when there is a case to attach it to.
    pub fn start(
        &self,
        role: Role,
        ctx: &AppContext,
        headers: &HeaderMap,
        query: &LoginQuery,
    ) -> Result<(String, HeaderMap), LoginError> {
        let bound = self.bound_case(role, headers);
        check_requested_case(role, bound.as_ref(), query)?;
        let BoundCase {
            case_id,
            session_id,
        } = bound.unwrap_or_default();

        if role == Role::CertificateProvider && (case_id.is_empty() || session_id.is_empty()) {
            tracing::warn!("Certificate provider login without case reference or session");
            return Err(LoginError::MissingCaseReference(role));
        }

        let state = self.token()?;
        let nonce = self.token()?;
        let locale = ctx.lang.locale();
        let identity = role.wants_identity() && !case_id.is_empty();

        let url = self
            .provider
            .authorization_url(&state, &nonce, locale, identity);

        let mut headers = HeaderMap::new();
        self.codec
            .save(
                InFlightLoginSession {
                    state,
                    nonce,
                    locale: locale.to_string(),
                    role,
                    case_id,
                    session_id,
                    identity,
                },
                &mut headers,
            )
            .inspect_err(|e| tracing::error!("Failed to save in-flight login: {}", e))?;

        tracing::debug!("Starting {} login, identity requested: {}", role, identity);
        Ok((url, headers))
    }

    /// Sends the provider's response on to the callback of the role that
    /// started the login, in the language it was started in.
    pub fn dispatch_redirect(
        &self,
        headers: &HeaderMap,
        query: &CallbackQuery,
    ) -> Result<String, LoginError> {
        let in_flight = self.codec.load::<InFlightLoginSession>(headers)?;

        if let Some(state) = query.state.as_deref() {
            if !bool::from(state.as_bytes().ct_eq(in_flight.state.as_bytes())) {
                tracing::error!("State mismatch on auth redirect");
                return Err(SessionError::Invalid(SessionKind::OneLogin.to_string()).into());
            }
        }

        let mut forward = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("code", &query.code),
            ("state", &query.state),
            ("error", &query.error),
        ] {
            if let Some(value) = value {
                forward.append_pair(key, value);
            }
        }

        let lang = Lang::from_locale(&in_flight.locale);
        let path = lang.url(&in_flight.role.callback_path());
        let query = forward.finish();

        Ok(if query.is_empty() {
            path
        } else {
            format!("{path}?{query}")
        })
    }
}

pub(super) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn check_requested_case(
    role: Role,
    bound: Option<&BoundCase>,
    query: &LoginQuery,
) -> Result<(), LoginError> {
    let requested = [
        (
            non_empty(query.lpa_id.as_deref()),
            bound.map(|b| b.case_id.as_str()),
        ),
        (
            non_empty(query.session_id.as_deref()),
            bound.map(|b| b.session_id.as_str()),
        ),
    ];

    for (asked, held) in requested {
        if let Some(asked) = asked {
            if held != Some(asked) {
                tracing::warn!("{} login asked for a case the browser does not hold", role);
                return Err(LoginError::CaseMismatch(role));
            }
        }
    }
    Ok(())
}
