//! Typed session values in sealed cookies.
//!
//! Each value is wrapped in an envelope carrying its issue time, serialized
//! to JSON, sealed with AES-256-GCM using the cookie name as associated data,
//! and base64url encoded.

use chrono::{DateTime, Utc};
use http::header::{COOKIE, HeaderMap};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::utils::{Clock, SystemClock, base64url_decode, base64url_encode};
use crate::utils::{header_clear_cookie, header_set_cookie};

use super::config::{
    CSRF_COOKIE_MAX_AGE, CSRF_COOKIE_NAME, LOGIN_PARAMS_COOKIE_MAX_AGE, LOGIN_PARAMS_COOKIE_NAME,
    SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME, SHARE_CODE_COOKIE_MAX_AGE,
    SHARE_CODE_COOKIE_NAME, YOTI_COOKIE_MAX_AGE, YOTI_COOKIE_NAME,
};
use super::errors::SessionError;
use super::types::{AuthenticatedSession, SessionKind, SessionPayload, SessionValue};
use crate::context::Role;

const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub max_age: i64,
}

/// Which cookie scope and lifetime each session kind uses.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    specs: HashMap<SessionKind, CookieSpec>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: SessionKind, name: impl Into<String>, max_age: i64) -> Self {
        self.specs.insert(
            kind,
            CookieSpec {
                name: name.into(),
                max_age,
            },
        );
        self
    }

    /// `csrf`, `params`, `session`, `shareCode` and `yoti` scopes with the
    /// configured names.
    pub fn standard() -> Self {
        Self::new()
            .register(SessionKind::Csrf, CSRF_COOKIE_NAME.as_str(), CSRF_COOKIE_MAX_AGE)
            .register(
                SessionKind::OneLogin,
                LOGIN_PARAMS_COOKIE_NAME.as_str(),
                LOGIN_PARAMS_COOKIE_MAX_AGE,
            )
            .register(
                SessionKind::Donor,
                SESSION_COOKIE_NAME.as_str(),
                SESSION_COOKIE_MAX_AGE,
            )
            .register(
                SessionKind::CertificateProvider,
                SESSION_COOKIE_NAME.as_str(),
                SESSION_COOKIE_MAX_AGE,
            )
            .register(
                SessionKind::Attorney,
                SESSION_COOKIE_NAME.as_str(),
                SESSION_COOKIE_MAX_AGE,
            )
            .register(
                SessionKind::ShareCode,
                SHARE_CODE_COOKIE_NAME.as_str(),
                SHARE_CODE_COOKIE_MAX_AGE,
            )
            .register(SessionKind::Yoti, YOTI_COOKIE_NAME.as_str(), YOTI_COOKIE_MAX_AGE)
    }

    pub fn get(&self, kind: SessionKind) -> Option<&CookieSpec> {
        self.specs.get(&kind)
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    issued_at: DateTime<Utc>,
    value: SessionValue,
}

pub struct SessionCodec {
    key: [u8; 32],
    registry: SessionRegistry,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Fails unless every [`SessionKind`] has a cookie scope.
    pub fn new(secret: &[u8], registry: SessionRegistry) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::Storage("Empty session secret".to_string()));
        }

        for kind in SessionKind::ALL {
            if registry.get(kind).is_none() {
                tracing::error!("Session kind {} has no registered cookie scope", kind);
                return Err(SessionError::Unregistered(kind.to_string()));
            }
        }

        let key: [u8; 32] = Sha256::digest(secret).into();

        Ok(Self {
            key,
            registry,
            clock: Arc::new(SystemClock),
            rng: SystemRandom::new(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cookie_spec(&self, kind: SessionKind) -> Result<&CookieSpec, SessionError> {
        self.registry
            .get(kind)
            .ok_or_else(|| SessionError::Unregistered(kind.to_string()))
    }

    pub fn save<T: SessionPayload>(
        &self,
        payload: T,
        headers: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        self.save_value(payload.into_value(), headers)
    }

    pub fn save_value(
        &self,
        value: SessionValue,
        headers: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        let spec = self.cookie_spec(value.kind())?;
        let envelope = Envelope {
            issued_at: self.clock.now(),
            value,
        };
        let plaintext =
            serde_json::to_vec(&envelope).map_err(|e| SessionError::Storage(e.to_string()))?;
        let sealed = self.seal(&spec.name, plaintext)?;

        header_set_cookie(headers, &spec.name, &sealed, spec.max_age)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn load<T: SessionPayload>(&self, headers: &HeaderMap) -> Result<T, SessionError> {
        let missing = || SessionError::Missing(T::KIND.to_string());

        let value = self.read(T::KIND, headers)?.ok_or_else(missing)?;
        let payload = T::from_value(value).ok_or_else(missing)?;

        if !payload.valid() {
            tracing::warn!("{} session failed validation", T::KIND);
            return Err(SessionError::Invalid(T::KIND.to_string()));
        }
        Ok(payload)
    }

    /// Loads the authenticated session stored for `role`.
    pub fn load_authenticated(
        &self,
        role: Role,
        headers: &HeaderMap,
    ) -> Result<AuthenticatedSession, SessionError> {
        use super::types::{AttorneySession, CertificateProviderSession, DonorSession};

        match role {
            Role::Donor => self.load::<DonorSession>(headers).map(|s| s.0),
            Role::CertificateProvider => {
                self.load::<CertificateProviderSession>(headers).map(|s| s.0)
            }
            Role::Attorney => self.load::<AttorneySession>(headers).map(|s| s.0),
        }
    }

    /// Raw value held by the scope of `kind`, whatever its variant.
    ///
    /// Absent, undecryptable and expired cookies all read as `None`.
    pub fn read(
        &self,
        kind: SessionKind,
        headers: &HeaderMap,
    ) -> Result<Option<SessionValue>, SessionError> {
        let spec = self.cookie_spec(kind)?;

        let Some(raw) = cookie_value(headers, &spec.name)? else {
            tracing::debug!("No {} cookie found", spec.name);
            return Ok(None);
        };

        let Some(plaintext) = self.open(&spec.name, raw) else {
            tracing::debug!("Could not open {} cookie", spec.name);
            return Ok(None);
        };

        let envelope: Envelope = match serde_json::from_slice(&plaintext) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Undecodable {} cookie: {}", spec.name, e);
                return Ok(None);
            }
        };

        let age = self.clock.now() - envelope.issued_at;
        if age.num_seconds() > spec.max_age {
            tracing::debug!("{} cookie expired {}s ago", spec.name, age.num_seconds());
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    pub fn clear(&self, kind: SessionKind, headers: &mut HeaderMap) -> Result<(), SessionError> {
        let spec = self.cookie_spec(kind)?;
        header_clear_cookie(headers, &spec.name)
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(())
    }

    fn sealing_key(&self) -> Result<LessSafeKey, SessionError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| SessionError::Storage("Failed to build sealing key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }

    fn seal(&self, name: &str, mut in_out: Vec<u8>) -> Result<String, SessionError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| SessionError::Storage("Failed to generate nonce".to_string()))?;

        self.sealing_key()?
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(name.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| SessionError::Storage("Failed to seal session".to_string()))?;

        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&in_out);
        Ok(base64url_encode(out)?)
    }

    fn open(&self, name: &str, raw: &str) -> Option<Vec<u8>> {
        let bytes = base64url_decode(raw).ok()?;
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return None;
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).ok()?;
        let mut in_out = sealed.to_vec();

        let key = self.sealing_key().ok()?;
        let plaintext = key
            .open_in_place(nonce, Aad::from(name.as_bytes()), &mut in_out)
            .ok()?;
        Some(plaintext.to_vec())
    }
}

/// First non-empty value of the named cookie across all `Cookie` headers.
pub(crate) fn cookie_value<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> Result<Option<&'a str>, SessionError> {
    for header in headers.get_all(COOKIE) {
        let cookie_str = header.to_str().map_err(|e| {
            tracing::error!("Invalid cookie header: {}", e);
            SessionError::HeaderError("Invalid cookie header".to_string())
        })?;

        let found = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
            let mut parts = s.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(k), Some(v)) if k == name && !v.is_empty() => Some(v),
                _ => None,
            }
        });

        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{CsrfSession, DonorSession, InFlightLoginSession};
    use chrono::{Duration, TimeZone};
    use http::header::SET_COOKIE;
    use std::sync::Mutex;

    struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        fn at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn advance(&self, d: Duration) {
            let mut t = self.0.lock().unwrap();
            *t += d;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new()
            .register(SessionKind::Csrf, "csrf", 86400)
            .register(SessionKind::OneLogin, "params", 600)
            .register(SessionKind::Donor, "session", 86400)
            .register(SessionKind::CertificateProvider, "session", 86400)
            .register(SessionKind::Attorney, "session", 86400)
            .register(SessionKind::ShareCode, "shareCode", 86400)
            .register(SessionKind::Yoti, "yoti", 3600)
    }

    fn codec() -> SessionCodec {
        SessionCodec::new(b"test-secret", registry()).unwrap()
    }

    /// Turns `Set-Cookie` headers into a request `Cookie` header.
    fn echo_cookies(set: &HeaderMap) -> HeaderMap {
        let pairs: Vec<String> = set
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
            .collect();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, pairs.join("; ").parse().unwrap());
        headers
    }

    fn in_flight() -> InFlightLoginSession {
        InFlightLoginSession {
            state: "s1".to_string(),
            nonce: "n1".to_string(),
            locale: "en".to_string(),
            role: Role::Donor,
            case_id: "lpa-1".to_string(),
            session_id: "sess-1".to_string(),
            identity: true,
        }
    }

    fn donor() -> DonorSession {
        DonorSession(AuthenticatedSession {
            sub: "sub1".to_string(),
            email: "donor@example.com".to_string(),
            case_id: "lpa-1".to_string(),
            session_id: "sess-1".to_string(),
            id_token: "idt".to_string(),
        })
    }

    #[test]
    fn test_new_rejects_unregistered_kind() {
        let partial = SessionRegistry::new()
            .register(SessionKind::Csrf, "csrf", 86400)
            .register(SessionKind::OneLogin, "params", 600);

        let err = SessionCodec::new(b"secret", partial).unwrap_err();
        assert!(matches!(err, SessionError::Unregistered(kind) if kind == "donor"));
    }

    #[test]
    fn test_new_rejects_empty_secret() {
        assert!(SessionCodec::new(b"", registry()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let codec = codec();
        let mut set = HeaderMap::new();
        codec.save(in_flight(), &mut set).unwrap();

        let loaded: InFlightLoginSession = codec.load(&echo_cookies(&set)).unwrap();
        assert_eq!(loaded, in_flight());
    }

    #[test]
    fn test_cookie_attributes_per_kind() {
        let codec = codec();

        let mut set = HeaderMap::new();
        codec.save(in_flight(), &mut set).unwrap();
        codec.save(donor(), &mut set).unwrap();
        codec
            .save(
                CsrfSession {
                    token: "tok".to_string(),
                },
                &mut set,
            )
            .unwrap();

        let cookies: Vec<&str> = set
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 3);

        for (cookie, name, max_age) in [
            (cookies[0], "params", 600),
            (cookies[1], "session", 86400),
            (cookies[2], "csrf", 86400),
        ] {
            assert!(cookie.starts_with(&format!("{name}=")));
            assert!(cookie.contains("; Path=/"));
            assert!(cookie.contains("; HttpOnly"));
            assert!(cookie.contains("; Secure"));
            assert!(cookie.contains("; SameSite=Lax"));
            assert!(cookie.ends_with(&format!("; Max-Age={max_age}")));
        }
    }

    #[test]
    fn test_load_without_cookie_is_missing() {
        let err = codec().load::<DonorSession>(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, SessionError::Missing(kind) if kind == "donor"));
    }

    #[test]
    fn test_load_other_role_variant_is_missing() {
        let codec = codec();
        let mut set = HeaderMap::new();
        codec.save(donor(), &mut set).unwrap();

        let err = codec
            .load_authenticated(Role::Attorney, &echo_cookies(&set))
            .unwrap_err();
        assert!(matches!(err, SessionError::Missing(kind) if kind == "attorney"));
    }

    #[test]
    fn test_load_invalid_payload() {
        let codec = codec();
        let mut session = in_flight();
        session.state.clear();

        let mut set = HeaderMap::new();
        codec.save(session, &mut set).unwrap();

        let err = codec
            .load::<InFlightLoginSession>(&echo_cookies(&set))
            .unwrap_err();
        assert!(matches!(err, SessionError::Invalid(kind) if kind == "one-login"));
    }

    #[test]
    fn test_tampered_cookie_is_missing() {
        let codec = codec();
        let mut set = HeaderMap::new();
        codec.save(donor(), &mut set).unwrap();

        let cookie = set.get(SET_COOKIE).unwrap().to_str().unwrap();
        let value = cookie.split(';').next().unwrap().trim_start_matches("session=");
        let mut bytes = base64url_decode(value).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = base64url_encode(bytes).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("session={tampered}").parse().unwrap());

        assert!(matches!(
            codec.load::<DonorSession>(&headers),
            Err(SessionError::Missing(_))
        ));
    }

    #[test]
    fn test_value_cannot_move_between_scopes() {
        let codec = codec();
        let mut set = HeaderMap::new();
        codec.save(in_flight(), &mut set).unwrap();

        let cookie = set.get(SET_COOKIE).unwrap().to_str().unwrap();
        let value = cookie.split(';').next().unwrap().trim_start_matches("params=");

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("session={value}").parse().unwrap());

        assert_eq!(codec.read(SessionKind::Donor, &headers).unwrap(), None);
    }

    #[test]
    fn test_other_secret_cannot_open() {
        let mut set = HeaderMap::new();
        codec().save(donor(), &mut set).unwrap();

        let other = SessionCodec::new(b"another-secret", registry()).unwrap();
        assert!(other.load::<DonorSession>(&echo_cookies(&set)).is_err());
    }

    #[test]
    fn test_expired_in_flight_session_is_missing() {
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let codec = codec().with_clock(clock.clone());

        let mut set = HeaderMap::new();
        codec.save(in_flight(), &mut set).unwrap();
        let headers = echo_cookies(&set);

        clock.advance(Duration::seconds(599));
        assert!(codec.load::<InFlightLoginSession>(&headers).is_ok());

        clock.advance(Duration::seconds(2));
        assert!(matches!(
            codec.load::<InFlightLoginSession>(&headers),
            Err(SessionError::Missing(_))
        ));
    }

    #[test]
    fn test_clear_sets_negative_max_age() {
        let mut set = HeaderMap::new();
        codec().clear(SessionKind::OneLogin, &mut set).unwrap();

        assert_eq!(
            set.get(SET_COOKIE).unwrap().to_str().unwrap(),
            "params=; Path=/; HttpOnly; Secure; SameSite=Lax; Max-Age=-1"
        );
    }

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, "a=1; params=".parse().unwrap());
        headers.append(COOKIE, "params=xyz".parse().unwrap());

        assert_eq!(cookie_value(&headers, "params").unwrap(), Some("xyz"));
        assert_eq!(cookie_value(&headers, "a").unwrap(), Some("1"));
        assert_eq!(cookie_value(&headers, "b").unwrap(), None);
    }
}
