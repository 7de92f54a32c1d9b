use http::{HeaderMap, Method};

use crate::context::{AppContext, Role};
use crate::session::{SessionError, SessionKind, YotiSession, is_state_changing};
use crate::vendor::VendorError;

use super::callback::{continue_journey, could_not_confirm};
use super::errors::LoginError;
use super::flow::{LoginFlow, non_empty};
use super::types::{CallbackOutcome, VendorCallbackQuery, VendorStart};

impl LoginFlow {
    /// Begins a document check for the case the browser is bound to.
    pub async fn vendor_start(
        &self,
        role: Role,
        ctx: &AppContext,
        headers: &HeaderMap,
    ) -> Result<VendorStart, LoginError> {
        let vendor = self.vendor.as_ref().ok_or(LoginError::NoVendor)?;
        if !role.wants_identity() {
            return Err(LoginError::IdentityNotRequired(role));
        }

        let case_id = self
            .bound_case(role, headers)
            .map(|b| b.case_id)
            .ok_or(LoginError::MissingCaseReference(role))?;
        let callback = ctx.lang.url(&role.vendor_callback_path());

        let (_, stored) = self.stored_identity(role, Some(&case_id)).await?;
        if stored.is_some() {
            tracing::debug!("{} identity already confirmed, skipping vendor", role);
            return Ok(VendorStart::Redirect {
                location: callback,
                headers: HeaderMap::new(),
            });
        }

        let mut out = HeaderMap::new();
        self.codec.save(
            YotiSession {
                locale: ctx.lang.locale().to_string(),
                case_id,
                role,
            },
            &mut out,
        )?;

        if vendor.is_test() {
            tracing::debug!("Vendor in test mode, going straight to {}", callback);
            return Ok(VendorStart::Redirect {
                location: callback,
                headers: out,
            });
        }

        Ok(VendorStart::Widget {
            sdk_id: vendor.sdk_id().to_string(),
            scenario_id: vendor.scenario_id().to_string(),
            callback_url: format!("{}{}", self.public_url, callback),
            headers: out,
        })
    }

    /// Completes a document check.
    ///
    /// Reconciles the same way as the provider callback: a confirmed
    /// identity on the case short-circuits, a "continue" submission only
    /// navigates, and only a confirmed result is written.
    #[tracing::instrument(skip(self, ctx, headers, query), fields(lang = ?ctx.lang))]
    pub async fn vendor_callback(
        &self,
        role: Role,
        ctx: &AppContext,
        method: &Method,
        headers: &HeaderMap,
        query: &VendorCallbackQuery,
    ) -> Result<CallbackOutcome, LoginError> {
        let vendor = self.vendor.as_ref().ok_or(LoginError::NoVendor)?;
        let check = self.codec.load::<YotiSession>(headers);

        let case_id = match &check {
            Ok(s) if s.role == role => Some(s.case_id.clone()),
            _ => self.bound_case(role, headers).map(|b| b.case_id),
        };
        let (record, stored) = self.stored_identity(role, case_id.as_deref()).await?;

        if is_state_changing(method) {
            return Ok(continue_journey(role, ctx, case_id.as_deref(), stored.is_some()));
        }

        if let Some(result) = stored {
            return Ok(self.already_confirmed(role, result));
        }

        let check = check?;
        if check.role != role {
            tracing::error!(
                "Vendor callback for {} but check was started for {}",
                role,
                check.role
            );
            return Err(SessionError::Invalid(SessionKind::Yoti.to_string()).into());
        }

        let token = non_empty(query.token.as_deref()).unwrap_or_default();
        if token.is_empty() && !vendor.is_test() {
            return Err(VendorError::MissingToken.into());
        }

        let result = vendor.user(token).await?;
        if !result.confirmed {
            tracing::warn!("Vendor could not confirm {} identity", role);
            return Ok(could_not_confirm(role, ctx, case_id.as_deref()));
        }

        let (Some(case_id), Some(record)) = (case_id, record) else {
            tracing::error!("Confirmed {} identity has no case to attach to", role);
            return Err(LoginError::MissingCaseReference(role));
        };

        let mut out = HeaderMap::new();
        self.codec.clear(SessionKind::Yoti, &mut out)?;
        self.link_identity(role, &case_id, record, result, out).await
    }
}
