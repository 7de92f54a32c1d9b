use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use url::Url;

use super::claim::parse_identity_claim;
use super::config::OneLoginConfig;
use super::discovery::Endpoints;
use super::errors::OneLoginError;
use super::idtoken::{check_nonce, verify_id_token};
use super::types::{
    CORE_IDENTITY_CLAIM, IdentityClaimResult, OidcTokenResponse, TokenResponse, UserInfo,
};

const VTR_LOGIN: &str = r#"["Cl.Cm"]"#;
const VTR_IDENTITY: &str = r#"["Cl.Cm.P2"]"#;
const JWKS_CACHE_EXPIRATION: Duration = Duration::from_secs(600);
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// The steps of an authorization-code login against the identity provider.
///
/// Kept separate so callers can skip network calls when they already know
/// the outcome, and so each failure surfaces as its own error.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    fn authorization_url(&self, state: &str, nonce: &str, locale: &str, identity: bool) -> String;

    async fn exchange(&self, code: &str, nonce: &str) -> Result<TokenResponse, OneLoginError>;

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, OneLoginError>;

    fn parse_identity_claim(&self, user_info: &UserInfo)
    -> Result<IdentityClaimResult, OneLoginError>;

    fn end_session_url(&self, id_token: &str, post_logout_redirect: &str) -> String;
}

/// Private key for the `private_key_jwt` client assertion.
pub struct SigningKey {
    key: EncodingKey,
    alg: Algorithm,
}

impl SigningKey {
    /// Accepts an RSA (RS256) or EC P-256 (ES256) private key.
    pub fn from_pem(pem: &str) -> Result<Self, OneLoginError> {
        if let Ok(key) = EncodingKey::from_rsa_pem(pem.as_bytes()) {
            return Ok(Self {
                key,
                alg: Algorithm::RS256,
            });
        }
        let key = EncodingKey::from_ec_pem(pem.as_bytes())
            .map_err(|e| OneLoginError::Config(format!("Invalid signing key: {e}")))?;
        Ok(Self {
            key,
            alg: Algorithm::ES256,
        })
    }

    pub fn new(key: EncodingKey, alg: Algorithm) -> Self {
        Self { key, alg }
    }
}

#[derive(Debug, Serialize)]
struct ClientAssertion<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    jti: String,
    iat: i64,
    exp: i64,
}

pub struct OneLoginClient {
    http: reqwest::Client,
    client_id: String,
    redirect_uri: String,
    endpoints: Endpoints,
    signing_key: SigningKey,
    identity_key: DecodingKey,
    jwks: RwLock<Option<(JwkSet, Instant)>>,
}

impl OneLoginClient {
    pub fn new(
        config: &OneLoginConfig,
        endpoints: Endpoints,
        signing_key: SigningKey,
        identity_key: DecodingKey,
    ) -> Result<Self, OneLoginError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OneLoginError::Config(e.to_string()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            endpoints,
            signing_key,
            identity_key,
            jwks: RwLock::new(None),
        })
    }

    /// Parses the configured keys and resolves endpoints, running discovery
    /// once if any endpoint is not configured.
    pub async fn from_config(config: OneLoginConfig) -> Result<Self, OneLoginError> {
        let signing_key = SigningKey::from_pem(&config.signing_key_pem)?;
        let identity_key = DecodingKey::from_ec_pem(config.identity_public_key_pem.as_bytes())
            .map_err(|e| OneLoginError::Config(format!("Invalid identity public key: {e}")))?;
        let endpoints = Endpoints::resolve(&config).await?;

        tracing::info!("Identity provider client ready for issuer {}", endpoints.issuer);
        Self::new(&config, endpoints, signing_key, identity_key)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn client_assertion(&self) -> Result<String, OneLoginError> {
        let now = Utc::now().timestamp();
        let claims = ClientAssertion {
            iss: &self.client_id,
            sub: &self.client_id,
            aud: &self.endpoints.token,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 300,
        };

        jsonwebtoken::encode(&Header::new(self.signing_key.alg), &claims, &self.signing_key.key)
            .map_err(|e| OneLoginError::Exchange(format!("Failed to sign client assertion: {e}")))
    }

    async fn jwks(&self) -> Result<JwkSet, OneLoginError> {
        if let Some((jwks, fetched_at)) = self.jwks.read().await.as_ref() {
            if fetched_at.elapsed() < JWKS_CACHE_EXPIRATION {
                return Ok(jwks.clone());
            }
        }

        tracing::debug!("Fetching JWKS from {}", self.endpoints.jwks);
        let response = self
            .http
            .get(&self.endpoints.jwks)
            .send()
            .await
            .map_err(|e| OneLoginError::Exchange(format!("JWKS fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OneLoginError::Exchange(format!(
                "JWKS fetch failed: {}",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| OneLoginError::Exchange(format!("JWKS parsing failed: {e}")))?;

        *self.jwks.write().await = Some((jwks.clone(), Instant::now()));
        Ok(jwks)
    }
}

#[async_trait]
impl IdentityProvider for OneLoginClient {
    fn authorization_url(&self, state: &str, nonce: &str, locale: &str, identity: bool) -> String {
        build_authorization_url(
            &self.endpoints.authorization,
            &self.client_id,
            &self.redirect_uri,
            state,
            nonce,
            locale,
            identity,
        )
    }

    async fn exchange(&self, code: &str, nonce: &str) -> Result<TokenResponse, OneLoginError> {
        let assertion = self.client_assertion()?;

        let response = self
            .http
            .post(&self.endpoints.token)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OneLoginError::Exchange(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                tracing::debug!("Token exchange succeeded");
            }
            status => {
                tracing::error!("Token exchange failed with status {}", status);
                return Err(OneLoginError::Exchange(status.to_string()));
            }
        };

        let body: OidcTokenResponse = response
            .json()
            .await
            .map_err(|e| OneLoginError::Exchange(e.to_string()))?;

        let id_token = body.id_token.ok_or_else(|| {
            OneLoginError::Exchange("ID token not present in response".to_string())
        })?;

        let jwks = self.jwks().await?;
        let claims = verify_id_token(&id_token, &jwks, &self.endpoints.issuer, &self.client_id)?;
        check_nonce(&claims, nonce)?;

        Ok(TokenResponse {
            access_token: body.access_token,
            id_token,
        })
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, OneLoginError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OneLoginError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            tracing::error!("User info request failed with status {}", response.status());
            return Err(OneLoginError::UserInfo(response.status().to_string()));
        }

        let user_info: UserInfo = response
            .json()
            .await
            .map_err(|e| OneLoginError::UserInfo(format!("Failed to deserialize user info: {e}")))?;

        tracing::debug!("User info received for sub {}", user_info.sub);
        Ok(user_info)
    }

    fn parse_identity_claim(
        &self,
        user_info: &UserInfo,
    ) -> Result<IdentityClaimResult, OneLoginError> {
        parse_identity_claim(&user_info.core_identity_jwt, &self.identity_key)
    }

    fn end_session_url(&self, id_token: &str, post_logout_redirect: &str) -> String {
        build_end_session_url(&self.endpoints.end_session, id_token, post_logout_redirect)
    }
}

pub(crate) fn build_authorization_url(
    endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    nonce: &str,
    locale: &str,
    identity: bool,
) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid email")
        .append_pair("state", state)
        .append_pair("nonce", nonce)
        .append_pair("ui_locales", locale);

    if identity {
        let claims = json!({ "userinfo": { CORE_IDENTITY_CLAIM: null } });
        query
            .append_pair("vtr", VTR_IDENTITY)
            .append_pair("claims", &claims.to_string());
    } else {
        query.append_pair("vtr", VTR_LOGIN);
    }

    join_query(endpoint, &query.finish())
}

pub(crate) fn build_end_session_url(
    endpoint: &str,
    id_token: &str,
    post_logout_redirect: &str,
) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token_hint", id_token)
        .append_pair("post_logout_redirect_uri", post_logout_redirect)
        .finish();

    join_query(endpoint, &query)
}

fn join_query(endpoint: &str, query: &str) -> String {
    let separator = match Url::parse(endpoint) {
        Ok(url) if url.query().is_some() => '&',
        _ => '?',
    };
    format!("{endpoint}{separator}{query}")
}
