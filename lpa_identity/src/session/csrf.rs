use http::header::{CONTENT_TYPE, HeaderMap};
use http::Method;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::context::{AppContext, Lang, Role};
use crate::utils::RandomString;

use super::codec::SessionCodec;
use super::errors::SessionError;
use super::types::{CsrfSession, InFlightLoginSession, ShareCodeSession};

/// Form field carrying the token on submissions.
pub const CSRF_FORM_FIELD: &str = "csrf";
/// Header alternative for scripted requests.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

const MIN_TOKEN_LEN: usize = 12;

/// The browser's CSRF token, and the cookie to set if it was just created.
#[derive(Debug, Clone)]
pub struct CsrfState {
    pub token: String,
    pub set_cookie: Option<HeaderMap>,
}

/// Issues and checks the per-browser anti-forgery token.
pub struct CsrfGuard {
    codec: Arc<SessionCodec>,
    random: Arc<dyn RandomString>,
}

impl CsrfGuard {
    pub fn new(codec: Arc<SessionCodec>, random: Arc<dyn RandomString>) -> Self {
        Self { codec, random }
    }

    /// Loads the stored token, creating one if the browser has none.
    pub fn ensure_token(&self, headers: &HeaderMap) -> Result<CsrfState, SessionError> {
        match self.codec.load::<CsrfSession>(headers) {
            Ok(session) => Ok(CsrfState {
                token: session.token,
                set_cookie: None,
            }),
            Err(SessionError::Missing(_) | SessionError::Invalid(_)) => {
                let token = self.random.generate()?;
                if token.len() < MIN_TOKEN_LEN {
                    tracing::error!("Generated CSRF token is too short: {}", token.len());
                    return Err(SessionError::CsrfToken(
                        "Generated token is too short".to_string(),
                    ));
                }

                let mut set_cookie = HeaderMap::new();
                self.codec.save(
                    CsrfSession {
                        token: token.clone(),
                    },
                    &mut set_cookie,
                )?;
                tracing::debug!("Issued new CSRF token");

                Ok(CsrfState {
                    token,
                    set_cookie: Some(set_cookie),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Rejects state-changing requests whose submitted token differs from the stored one.
    pub fn verify(
        &self,
        method: &Method,
        stored: &str,
        submitted: Option<&str>,
    ) -> Result<(), SessionError> {
        if !is_state_changing(method) {
            return Ok(());
        }

        match submitted {
            Some(submitted) if tokens_match(stored, submitted) => Ok(()),
            Some(_) => {
                tracing::error!("CSRF token mismatch on {} request", method);
                Err(SessionError::CsrfToken("CSRF token mismatch".to_string()))
            }
            None => {
                tracing::error!("CSRF token missing on {} request", method);
                Err(SessionError::CsrfToken("CSRF token missing".to_string()))
            }
        }
    }

    /// Request context for a checked request.
    ///
    /// A signed-in role session wins, then a share-code grant, then an
    /// in-flight login. A signed-in session without a case takes the case
    /// from a grant for the same role. Anything that does not decode is
    /// ignored here and reported by whoever needs it.
    pub fn resolve_context(&self, headers: &HeaderMap, lang: Lang, csrf_token: &str) -> AppContext {
        let base = AppContext::default()
            .with_lang(lang)
            .with_csrf_token(csrf_token);
        let grant = self.codec.load::<ShareCodeSession>(headers).ok();

        for role in Role::ALL {
            if let Ok(session) = self.codec.load_authenticated(role, headers) {
                return match &grant {
                    Some(g) if session.case_id.is_empty() && g.role == role => {
                        scoped(&base, role, &g.case_id, &g.session_id)
                    }
                    _ => scoped(&base, role, &session.case_id, &session.session_id),
                };
            }
        }

        if let Some(g) = grant {
            return scoped(&base, g.role, &g.case_id, &g.session_id);
        }

        match self.codec.load::<InFlightLoginSession>(headers) {
            Ok(in_flight) => scoped(
                &base,
                in_flight.role,
                &in_flight.case_id,
                &in_flight.session_id,
            ),
            Err(_) => base,
        }
    }
}

fn scoped(base: &AppContext, role: Role, case_id: &str, session_id: &str) -> AppContext {
    let mut ctx = base.with_role(role);
    if !case_id.is_empty() {
        ctx = ctx.with_case_id(case_id);
    }
    if !session_id.is_empty() {
        ctx = ctx.with_session_id(session_id);
    }
    ctx
}

pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn tokens_match(stored: &str, submitted: &str) -> bool {
    !stored.is_empty() && bool::from(stored.as_bytes().ct_eq(submitted.as_bytes()))
}

/// Token sent with a request: the header wins, then the `csrf` field of a
/// urlencoded body.
pub fn submitted_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if let Some(value) = headers.get(CSRF_HEADER).and_then(|h| h.to_str().ok()) {
        return Some(value.to_string());
    }

    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if !is_form {
        return None;
    }

    url::form_urlencoded::parse(body)
        .find(|(k, _)| k == CSRF_FORM_FIELD)
        .map(|(_, v)| v.into_owned())
}
