use http::HeaderMap;

use crate::context::Role;
use crate::session::ShareCodeSession;
use crate::storage::CaseRecord;

use super::errors::LoginError;
use super::flow::LoginFlow;

/// A case the browser has been granted, with the actor session it was
/// granted under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct BoundCase {
    pub(super) case_id: String,
    pub(super) session_id: String,
}

impl LoginFlow {
    /// The case `role` may act on from this browser.
    ///
    /// A signed-in session of the role that carries a case wins. Certificate
    /// providers and attorneys may instead hold a share-code grant for the
    /// role. Donors only ever reach a case through their own session.
    pub(super) fn bound_case(&self, role: Role, headers: &HeaderMap) -> Option<BoundCase> {
        if let Ok(session) = self.codec.load_authenticated(role, headers) {
            if !session.case_id.is_empty() {
                return Some(BoundCase {
                    case_id: session.case_id,
                    session_id: session.session_id,
                });
            }
        }

        if role == Role::Donor {
            return None;
        }

        match self.codec.load::<ShareCodeSession>(headers) {
            Ok(grant) if grant.role == role => Some(BoundCase {
                case_id: grant.case_id,
                session_id: grant.session_id,
            }),
            _ => None,
        }
    }

    /// Points the signed-in session of `role` at `case_id`.
    ///
    /// For callers that have already decided the actor may act on the case,
    /// such as the page that just created it.
    pub fn bind_case(
        &self,
        role: Role,
        case_id: &str,
        headers: &HeaderMap,
    ) -> Result<HeaderMap, LoginError> {
        if case_id.is_empty() {
            return Err(LoginError::MissingCaseReference(role));
        }

        let mut session = self.codec.load_authenticated(role, headers)?;
        session.case_id = case_id.to_string();

        let mut out = HeaderMap::new();
        self.codec
            .save_value(session.into_role_value(role), &mut out)?;
        tracing::debug!("Bound {} session to case {}", role, case_id);
        Ok(out)
    }

    /// Creates an empty case for the signed-in donor and binds it to their
    /// session.
    pub async fn create_case(
        &self,
        headers: &HeaderMap,
    ) -> Result<(String, HeaderMap), LoginError> {
        self.codec.load_authenticated(Role::Donor, headers)?;

        let case_id = uuid::Uuid::new_v4().to_string();
        self.cases.put(&CaseRecord::new(&case_id)).await?;

        let out = self.bind_case(Role::Donor, &case_id, headers)?;
        tracing::info!("Created case {}", case_id);
        Ok((case_id, out))
    }

    /// Grants this browser access to a case for `role` after its share code
    /// has been checked.
    ///
    /// The case must exist. Donor grants are never consulted.
    pub async fn grant_share_code(
        &self,
        role: Role,
        case_id: &str,
        session_id: &str,
    ) -> Result<HeaderMap, LoginError> {
        if case_id.is_empty() || session_id.is_empty() {
            return Err(LoginError::MissingCaseReference(role));
        }
        self.cases.get(case_id).await?;

        let mut out = HeaderMap::new();
        self.codec.save(
            ShareCodeSession {
                role,
                case_id: case_id.to_string(),
                session_id: session_id.to_string(),
            },
            &mut out,
        )?;
        tracing::debug!("Share code accepted for {} on case {}", role, case_id);
        Ok(out)
    }
}
