use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Name of the user-info claim holding the signed identity assertion.
pub const CORE_IDENTITY_CLAIM: &str = "https://vocab.account.gov.uk/v1/coreIdentityJWT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OidcTokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: Option<String>,
    pub(crate) expires_in: Option<u64>,
    pub(crate) id_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub id_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(
        rename = "https://vocab.account.gov.uk/v1/coreIdentityJWT",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub core_identity_jwt: String,
}

/// Outcome of reading a verified identity from the provider.
///
/// When `confirmed` is false the remaining fields carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaimResult {
    pub confirmed: bool,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub retrieved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl IdentityClaimResult {
    pub fn not_confirmed() -> Self {
        Self::default()
    }
}
