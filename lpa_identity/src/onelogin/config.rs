use std::env;

use crate::config::{APP_PUBLIC_URL, auth_redirect_uri};

use super::errors::OneLoginError;

/// Settings for talking to the identity provider.
#[derive(Debug, Clone, Default)]
pub struct OneLoginConfig {
    pub issuer: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// PEM private key used to sign the `private_key_jwt` client assertion.
    pub signing_key_pem: String,
    /// PEM public key that signs the core identity assertion.
    pub identity_public_key_pem: String,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
    pub end_session_endpoint: Option<String>,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn required(key: &str) -> Result<String, OneLoginError> {
    optional(key).ok_or_else(|| OneLoginError::Config(format!("{key} must be set")))
}

impl OneLoginConfig {
    pub fn from_env() -> Result<Self, OneLoginError> {
        Ok(Self {
            issuer: optional("ONE_LOGIN_ISSUER")
                .unwrap_or("https://oidc.integration.account.gov.uk".to_string())
                .trim_end_matches('/')
                .to_string(),
            client_id: required("ONE_LOGIN_CLIENT_ID")?,
            redirect_uri: auth_redirect_uri(&APP_PUBLIC_URL),
            signing_key_pem: required("ONE_LOGIN_PRIVATE_KEY")?,
            identity_public_key_pem: required("ONE_LOGIN_IDENTITY_PUBLIC_KEY")?,
            authorization_endpoint: optional("ONE_LOGIN_AUTH_URL"),
            token_endpoint: optional("ONE_LOGIN_TOKEN_URL"),
            userinfo_endpoint: optional("ONE_LOGIN_USERINFO_URL"),
            jwks_uri: optional("ONE_LOGIN_JWKS_URL"),
            end_session_endpoint: optional("ONE_LOGIN_END_SESSION_URL"),
        })
    }
}
