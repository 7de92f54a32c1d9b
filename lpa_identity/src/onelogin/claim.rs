//! Reading the core identity assertion returned in user info.

use chrono::{DateTime, NaiveDate};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::errors::OneLoginError;
use super::types::IdentityClaimResult;

/// Level of confidence that counts as a verified identity.
const CONFIRMED_VOT: &str = "P2";

#[derive(Debug, Deserialize)]
struct CoreIdentityClaims {
    iat: Option<i64>,
    vot: Option<String>,
    vc: VerifiableCredential,
}

#[derive(Debug, Deserialize)]
struct VerifiableCredential {
    #[serde(rename = "credentialSubject")]
    credential_subject: CredentialSubject,
}

#[derive(Debug, Deserialize)]
struct CredentialSubject {
    #[serde(default)]
    name: Vec<Name>,
    #[serde(rename = "birthDate", default)]
    birth_date: Vec<BirthDate>,
}

#[derive(Debug, Deserialize)]
struct Name {
    #[serde(rename = "nameParts", default)]
    name_parts: Vec<NamePart>,
}

#[derive(Debug, Deserialize)]
struct NamePart {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct BirthDate {
    value: String,
}

impl Name {
    /// Given names in order, then family names.
    fn full_name(&self) -> String {
        let parts_of = |kind: &str| {
            self.name_parts
                .iter()
                .filter(|p| p.kind == kind)
                .map(|p| p.value.trim())
                .filter(|v| !v.is_empty())
                .collect::<Vec<_>>()
        };

        let mut parts = parts_of("GivenName");
        parts.extend(parts_of("FamilyName"));
        parts.join(" ")
    }
}

/// Verifies and decodes the signed identity assertion.
///
/// An empty claim, or one that names nobody, is a normal "not confirmed"
/// outcome. A claim that is present but cannot be verified is an error.
pub fn parse_identity_claim(
    raw: &str,
    key: &DecodingKey,
) -> Result<IdentityClaimResult, OneLoginError> {
    if raw.is_empty() {
        tracing::debug!("No identity claim in user info");
        return Ok(IdentityClaimResult::not_confirmed());
    }

    let mut validation = Validation::new(Algorithm::ES256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    let data = jsonwebtoken::decode::<serde_json::Value>(raw, key, &validation).map_err(|e| {
        tracing::error!("Identity claim verification failed: {}", e);
        OneLoginError::ClaimParse(e.to_string())
    })?;

    let claims: CoreIdentityClaims = serde_json::from_value(data.claims.clone())
        .map_err(|e| OneLoginError::ClaimParse(format!("Unexpected claim shape: {e}")))?;

    if let Some(vot) = claims.vot.as_deref() {
        if vot != CONFIRMED_VOT {
            tracing::warn!("Identity claim has insufficient vot: {}", vot);
            return Ok(IdentityClaimResult::not_confirmed());
        }
    }

    let full_name = claims
        .vc
        .credential_subject
        .name
        .first()
        .map(Name::full_name)
        .unwrap_or_default();
    if full_name.is_empty() {
        tracing::warn!("Identity claim does not name anyone");
        return Ok(IdentityClaimResult::not_confirmed());
    }

    let date_of_birth = claims
        .vc
        .credential_subject
        .birth_date
        .first()
        .map(|d| NaiveDate::parse_from_str(&d.value, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| OneLoginError::ClaimParse(format!("Invalid birth date: {e}")))?;

    let retrieved_at = claims
        .iat
        .map(|iat| {
            DateTime::from_timestamp(iat, 0)
                .ok_or_else(|| OneLoginError::ClaimParse(format!("Invalid iat: {iat}")))
        })
        .transpose()?;

    Ok(IdentityClaimResult {
        confirmed: true,
        full_name,
        date_of_birth,
        retrieved_at,
        raw: Some(data.claims),
    })
}
