use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::OneLoginConfig;
use super::errors::OneLoginError;

/// The parts of `/.well-known/openid-configuration` this client uses.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OidcDiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    pub end_session_endpoint: Option<String>,
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
}

/// Provider endpoints after applying configured overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub issuer: String,
    pub authorization: String,
    pub token: String,
    pub userinfo: String,
    pub jwks: String,
    pub end_session: String,
}

impl Endpoints {
    /// Overrides win. Returns `None` if discovery is needed to fill the gaps.
    pub fn from_overrides(config: &OneLoginConfig) -> Option<Self> {
        Some(Self {
            issuer: config.issuer.clone(),
            authorization: config.authorization_endpoint.clone()?,
            token: config.token_endpoint.clone()?,
            userinfo: config.userinfo_endpoint.clone()?,
            jwks: config.jwks_uri.clone()?,
            end_session: config.end_session_endpoint.clone()?,
        })
    }

    pub fn merge(config: &OneLoginConfig, document: OidcDiscoveryDocument) -> Self {
        let end_session = document
            .end_session_endpoint
            .unwrap_or_else(|| format!("{}/logout", config.issuer));

        Self {
            issuer: document.issuer,
            authorization: config
                .authorization_endpoint
                .clone()
                .unwrap_or(document.authorization_endpoint),
            token: config
                .token_endpoint
                .clone()
                .unwrap_or(document.token_endpoint),
            userinfo: config
                .userinfo_endpoint
                .clone()
                .unwrap_or(document.userinfo_endpoint),
            jwks: config.jwks_uri.clone().unwrap_or(document.jwks_uri),
            end_session: config.end_session_endpoint.clone().unwrap_or(end_session),
        }
    }

    pub async fn resolve(config: &OneLoginConfig) -> Result<Self, OneLoginError> {
        if let Some(endpoints) = Self::from_overrides(config) {
            tracing::debug!("All provider endpoints configured, skipping discovery");
            return Ok(endpoints);
        }

        let document = fetch_oidc_discovery(&config.issuer).await?;
        Ok(Self::merge(config, document))
    }
}

/// Fetch the discovery document from `{issuer}/.well-known/openid-configuration`.
pub(crate) async fn fetch_oidc_discovery(
    issuer_url: &str,
) -> Result<OidcDiscoveryDocument, OneLoginError> {
    let issuer_url = issuer_url.trim_end_matches('/');
    let discovery_url = format!("{issuer_url}/.well-known/openid-configuration");

    tracing::debug!("Fetching OIDC discovery from: {}", discovery_url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| OneLoginError::Discovery(e.to_string()))?;

    let response = client
        .get(&discovery_url)
        .send()
        .await
        .map_err(|e| OneLoginError::Discovery(e.to_string()))?;

    if !response.status().is_success() {
        tracing::error!("OIDC discovery failed with status: {}", response.status());
        return Err(OneLoginError::Discovery(format!(
            "HTTP status {}",
            response.status()
        )));
    }

    let document: OidcDiscoveryDocument = response
        .json()
        .await
        .map_err(|e| OneLoginError::Discovery(e.to_string()))?;

    check_issuer(&document, issuer_url)?;

    tracing::debug!("Authorization endpoint: {}", document.authorization_endpoint);
    tracing::debug!("Token endpoint: {}", document.token_endpoint);
    tracing::debug!("JWKS URI: {}", document.jwks_uri);

    Ok(document)
}

fn check_issuer(document: &OidcDiscoveryDocument, expected: &str) -> Result<(), OneLoginError> {
    if document.issuer.trim_end_matches('/') != expected {
        tracing::error!(
            "Issuer mismatch in discovery document. Expected: {}, Found: {}",
            expected,
            document.issuer
        );
        return Err(OneLoginError::Discovery(format!(
            "Issuer mismatch: discovered={}, expected={}",
            document.issuer, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> OidcDiscoveryDocument {
        serde_json::from_value(json!({
            "issuer": "https://oidc.example.gov.uk/",
            "authorization_endpoint": "https://oidc.example.gov.uk/authorize",
            "token_endpoint": "https://oidc.example.gov.uk/token",
            "userinfo_endpoint": "https://oidc.example.gov.uk/userinfo",
            "jwks_uri": "https://oidc.example.gov.uk/.well-known/jwks.json",
            "end_session_endpoint": "https://oidc.example.gov.uk/logout",
            "scopes_supported": ["openid", "email", "phone"],
            "id_token_signing_alg_values_supported": ["ES256", "RS256"]
        }))
        .unwrap()
    }

    fn config() -> OneLoginConfig {
        OneLoginConfig {
            issuer: "https://oidc.example.gov.uk".to_string(),
            client_id: "client".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_overrides_incomplete_needs_discovery() {
        let mut config = config();
        config.token_endpoint = Some("http://mock/token".to_string());
        assert!(Endpoints::from_overrides(&config).is_none());
    }

    #[test]
    fn test_overrides_complete_skip_discovery() {
        let mut config = config();
        config.authorization_endpoint = Some("http://mock/authorize".to_string());
        config.token_endpoint = Some("http://mock/token".to_string());
        config.userinfo_endpoint = Some("http://mock/userinfo".to_string());
        config.jwks_uri = Some("http://mock/jwks".to_string());
        config.end_session_endpoint = Some("http://mock/logout".to_string());

        let endpoints = Endpoints::from_overrides(&config).unwrap();
        assert_eq!(endpoints.token, "http://mock/token");
        assert_eq!(endpoints.issuer, "https://oidc.example.gov.uk");
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut config = config();
        config.token_endpoint = Some("http://internal/token".to_string());

        let endpoints = Endpoints::merge(&config, document());

        assert_eq!(endpoints.token, "http://internal/token");
        assert_eq!(endpoints.authorization, "https://oidc.example.gov.uk/authorize");
        assert_eq!(endpoints.end_session, "https://oidc.example.gov.uk/logout");
    }

    #[test]
    fn test_merge_defaults_end_session() {
        let mut doc = document();
        doc.end_session_endpoint = None;

        let endpoints = Endpoints::merge(&config(), doc);
        assert_eq!(endpoints.end_session, "https://oidc.example.gov.uk/logout");
    }

    #[test]
    fn test_check_issuer() {
        assert!(check_issuer(&document(), "https://oidc.example.gov.uk").is_ok());
        assert!(matches!(
            check_issuer(&document(), "https://evil.example"),
            Err(OneLoginError::Discovery(_))
        ));
    }
}
