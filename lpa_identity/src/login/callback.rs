use http::{HeaderMap, Method};
use subtle::ConstantTimeEq;

use crate::context::{AppContext, Role};
use crate::onelogin::{IdentityClaimResult, OneLoginError};
use crate::session::{
    AuthenticatedSession, InFlightLoginSession, SessionError, SessionKind, is_state_changing,
};
use crate::storage::{CacheData, CaseRecord};

use super::errors::LoginError;
use super::flow::{LoginFlow, non_empty};
use super::types::{CallbackOutcome, CallbackQuery};

const CONSUMED_LOGIN_PREFIX: &str = "consumed-login";
/// Matches the lifetime of the `params` cookie a state value travels in.
const CONSUMED_LOGIN_TTL: usize = 600;
const ACCESS_DENIED: &str = "access_denied";

impl LoginFlow {
    /// Completes a login for `role`.
    ///
    /// A confirmed identity already on the case wins over anything in the
    /// request, so repeating the callback is harmless and makes no provider
    /// calls. Otherwise the code is redeemed once, the identity read and,
    /// when confirmed, linked to the case and to the browser session.
    ///
    /// The case is the one sealed into the in-flight login, or failing that
    /// the one the browser is bound to. Nothing in the request chooses it.
    #[tracing::instrument(skip(self, ctx, headers, query), fields(lang = ?ctx.lang))]
    pub async fn callback(
        &self,
        role: Role,
        ctx: &AppContext,
        method: &Method,
        headers: &HeaderMap,
        query: &CallbackQuery,
    ) -> Result<CallbackOutcome, LoginError> {
        let in_flight = self.codec.load::<InFlightLoginSession>(headers);

        let case_id = match &in_flight {
            Ok(s) if s.role == role && !s.case_id.is_empty() => Some(s.case_id.clone()),
            _ => self.bound_case(role, headers).map(|b| b.case_id),
        };
        let (record, stored) = self.stored_identity(role, case_id.as_deref()).await?;

        if is_state_changing(method) {
            return Ok(continue_journey(role, ctx, case_id.as_deref(), stored.is_some()));
        }

        if let Some(result) = stored {
            return Ok(self.already_confirmed(role, result));
        }

        if let Some(error) = query.error.as_deref() {
            if error == ACCESS_DENIED {
                tracing::warn!("Provider could not confirm {} identity", role);
                return Ok(could_not_confirm(role, ctx, case_id.as_deref()));
            }
            return Err(OneLoginError::Provider(error.to_string()).into());
        }

        let in_flight = in_flight?;
        self.check_in_flight(role, &in_flight, query)?;

        let code = non_empty(query.code.as_deref())
            .ok_or_else(|| OneLoginError::Exchange("No authorization code".to_string()))?;
        self.consume_state(&in_flight.state).await?;

        let token = self.provider.exchange(code, &in_flight.nonce).await?;
        let user_info = self.provider.user_info(&token.access_token).await?;

        let session = AuthenticatedSession {
            sub: user_info.sub.clone(),
            email: user_info.email.clone(),
            case_id: case_id.clone().unwrap_or_default(),
            session_id: in_flight.session_id.clone(),
            id_token: token.id_token,
        };

        if !in_flight.identity {
            let headers = self.persist_session(role, session)?;
            let location = ctx.lang.url(&role.forward_path(case_id.as_deref()));
            tracing::debug!("{} signed in, continuing to {}", role, location);
            return Ok(CallbackOutcome::Redirect { location, headers });
        }

        let result = self.provider.parse_identity_claim(&user_info)?;
        if !result.confirmed {
            tracing::warn!("Identity for {} not confirmed", role);
            return Ok(could_not_confirm(role, ctx, case_id.as_deref()));
        }

        let (Some(case_id), Some(record)) = (case_id, record) else {
            tracing::error!("Confirmed {} identity has no case to attach to", role);
            return Err(LoginError::MissingCaseReference(role));
        };

        let headers = self.persist_session(role, session)?;
        self.link_identity(role, &case_id, record, result, headers).await
    }

    /// The record for `case_id` and the confirmed identity `role` already
    /// has on it.
    pub(super) async fn stored_identity(
        &self,
        role: Role,
        case_id: Option<&str>,
    ) -> Result<(Option<CaseRecord>, Option<IdentityClaimResult>), LoginError> {
        let Some(id) = case_id else {
            return Ok((None, None));
        };
        let record = self.cases.get(id).await?;
        let stored = record.identity_for(role).filter(|r| r.confirmed).cloned();
        Ok((Some(record), stored))
    }

    pub(super) fn already_confirmed(
        &self,
        role: Role,
        result: IdentityClaimResult,
    ) -> CallbackOutcome {
        tracing::debug!("{} identity already confirmed, skipping provider", role);
        CallbackOutcome::Confirmed {
            confirmed_at: result.retrieved_at.unwrap_or_else(|| self.clock.now()),
            full_name: result.full_name,
            headers: HeaderMap::new(),
        }
    }

    /// Writes a confirmed identity onto the case. `headers` are passed
    /// through to the outcome.
    pub(super) async fn link_identity(
        &self,
        role: Role,
        case_id: &str,
        mut record: CaseRecord,
        mut result: IdentityClaimResult,
        headers: HeaderMap,
    ) -> Result<CallbackOutcome, LoginError> {
        let confirmed_at = *result.retrieved_at.get_or_insert_with(|| self.clock.now());
        let full_name = result.full_name.clone();

        record.set_identity(role, result);
        self.cases.put(&record).await?;

        tracing::info!("Confirmed {} identity on case {}", role, case_id);
        Ok(CallbackOutcome::Confirmed {
            full_name,
            confirmed_at,
            headers,
        })
    }

    fn check_in_flight(
        &self,
        role: Role,
        in_flight: &InFlightLoginSession,
        query: &CallbackQuery,
    ) -> Result<(), LoginError> {
        let invalid = || SessionError::Invalid(SessionKind::OneLogin.to_string());

        if in_flight.role != role {
            tracing::error!(
                "Callback for {} but login was started for {}",
                role,
                in_flight.role
            );
            return Err(invalid().into());
        }

        let state = query.state.as_deref().unwrap_or_default();
        if !bool::from(state.as_bytes().ct_eq(in_flight.state.as_bytes())) {
            tracing::error!("State mismatch on {} callback", role);
            return Err(invalid().into());
        }

        if in_flight.nonce.is_empty() {
            tracing::error!("In-flight login for {} has no nonce", role);
            return Err(LoginError::MissingNonce);
        }

        Ok(())
    }

    /// Marks `state` as used. A second callback with the same state fails.
    async fn consume_state(&self, state: &str) -> Result<(), LoginError> {
        let first_use = self
            .consumed
            .put_if_not_exists(
                CONSUMED_LOGIN_PREFIX,
                state,
                CacheData {
                    value: self.clock.now().to_rfc3339(),
                },
                CONSUMED_LOGIN_TTL,
            )
            .await?;

        if !first_use {
            tracing::error!("Login state has already been used");
            return Err(SessionError::Invalid(SessionKind::OneLogin.to_string()).into());
        }
        Ok(())
    }

    fn persist_session(
        &self,
        role: Role,
        session: AuthenticatedSession,
    ) -> Result<HeaderMap, LoginError> {
        let mut headers = HeaderMap::new();
        self.codec
            .save_value(session.into_role_value(role), &mut headers)?;
        self.codec.clear(SessionKind::OneLogin, &mut headers)?;
        Ok(headers)
    }
}

/// The "continue" submission: forward once confirmed, otherwise back to
/// choosing how to prove identity.
pub(super) fn continue_journey(
    role: Role,
    ctx: &AppContext,
    case_id: Option<&str>,
    confirmed: bool,
) -> CallbackOutcome {
    let path = if confirmed {
        role.forward_path(case_id)
    } else {
        role.restart_path(case_id)
    };
    tracing::debug!("Continuing {} journey to {}", role, path);
    CallbackOutcome::Redirect {
        location: ctx.lang.url(&path),
        headers: HeaderMap::new(),
    }
}

pub(super) fn could_not_confirm(
    role: Role,
    ctx: &AppContext,
    case_id: Option<&str>,
) -> CallbackOutcome {
    CallbackOutcome::CouldNotConfirm {
        restart_path: ctx.lang.url(&role.restart_path(case_id)),
    }
}
