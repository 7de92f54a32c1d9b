use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::errors::OneLoginError;

const ALLOWED_ALGORITHMS: [Algorithm; 2] = [Algorithm::ES256, Algorithm::RS256];

#[allow(unused)]
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct IdTokenClaims {
    pub(crate) iss: String,
    pub(crate) sub: String,
    pub(crate) exp: i64,
    pub(crate) iat: Option<i64>,
    pub(crate) nonce: Option<String>,
    pub(crate) vot: Option<String>,
    pub(crate) sid: Option<String>,
}

/// Verifies signature, issuer, audience and expiry of an ID token.
pub(crate) fn verify_id_token(
    token: &str,
    jwks: &JwkSet,
    issuer: &str,
    client_id: &str,
) -> Result<IdTokenClaims, OneLoginError> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| OneLoginError::Exchange(format!("Malformed ID token: {e}")))?;

    if !ALLOWED_ALGORITHMS.contains(&header.alg) {
        return Err(OneLoginError::Exchange(format!(
            "Unsupported ID token algorithm: {:?}",
            header.alg
        )));
    }

    let kid = header
        .kid
        .ok_or_else(|| OneLoginError::Exchange("ID token has no kid".to_string()))?;
    let jwk = jwks
        .find(&kid)
        .ok_or_else(|| OneLoginError::Exchange(format!("No JWK for kid {kid}")))?;
    let key = DecodingKey::from_jwk(jwk)
        .map_err(|e| OneLoginError::Exchange(format!("Unusable JWK: {e}")))?;

    let issuer = issuer.trim_end_matches('/');
    let mut validation = Validation::new(header.alg);
    validation.set_issuer(&[issuer.to_string(), format!("{issuer}/")]);
    validation.set_audience(&[client_id]);

    let data = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &validation).map_err(|e| {
        tracing::error!("ID token verification failed: {}", e);
        OneLoginError::Exchange(format!("ID token verification failed: {e}"))
    })?;

    Ok(data.claims)
}

pub(crate) fn check_nonce(claims: &IdTokenClaims, expected: &str) -> Result<(), OneLoginError> {
    let matches = claims
        .nonce
        .as_deref()
        .map(|nonce| bool::from(nonce.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false);

    if !matches {
        tracing::error!("Nonce in ID token does not match the login session");
        return Err(OneLoginError::Exchange("Nonce mismatch".to_string()));
    }
    Ok(())
}
