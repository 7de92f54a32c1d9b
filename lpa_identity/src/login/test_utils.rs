//! Hand-written collaborators for exercising `LoginFlow` without a network.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use http::HeaderMap;
use http::header::{COOKIE, SET_COOKIE};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::Role;
use crate::onelogin::{
    IdentityClaimResult, IdentityProvider, OneLoginError, TokenResponse, UserInfo,
};
use crate::session::{AuthenticatedSession, SessionCodec, SessionKind, SessionRegistry};
use crate::storage::{
    CaseRecord, CaseStore, InMemoryCacheStore, InMemoryCaseStore, StorageError,
};
use crate::utils::{Clock, RandomString, UtilError};
use crate::vendor::{IdentityVendor, VendorError};

use super::flow::LoginFlow;

pub(crate) const PUBLIC_URL: &str = "https://lpa.test";

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// `token-00000001`, `token-00000002`, ... long enough to pass the
/// minimum token length.
pub(crate) struct SequenceRandom(AtomicUsize);

impl RandomString for SequenceRandom {
    fn generate(&self) -> Result<String, UtilError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{n:08}"))
    }
}

pub(crate) struct FixedRandom(pub(crate) &'static str);

impl RandomString for FixedRandom {
    fn generate(&self) -> Result<String, UtilError> {
        Ok(self.0.to_string())
    }
}

pub(crate) struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        fixed_now()
    }
}

pub(crate) fn confirmed(full_name: &str) -> IdentityClaimResult {
    IdentityClaimResult {
        confirmed: true,
        full_name: full_name.to_string(),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(2000, 1, 2),
        retrieved_at: None,
        raw: None,
    }
}

/// Identity provider that answers from fixed values and counts calls.
pub(crate) struct MockProvider {
    pub(crate) exchange_calls: AtomicUsize,
    pub(crate) user_info_calls: AtomicUsize,
    pub(crate) claim_calls: AtomicUsize,
    pub(crate) last_nonce: Mutex<Option<String>>,
    exchange: Mutex<Result<TokenResponse, OneLoginError>>,
    claim: Mutex<Result<IdentityClaimResult, OneLoginError>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self {
            exchange_calls: AtomicUsize::new(0),
            user_info_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
            last_nonce: Mutex::new(None),
            exchange: Mutex::new(Ok(TokenResponse {
                access_token: "access-token".to_string(),
                id_token: "id-token".to_string(),
            })),
            claim: Mutex::new(Ok(confirmed("Sam Smith"))),
        }
    }

    pub(crate) fn set_exchange(&self, result: Result<TokenResponse, OneLoginError>) {
        *self.exchange.lock().unwrap() = result;
    }

    pub(crate) fn set_claim(&self, result: Result<IdentityClaimResult, OneLoginError>) {
        *self.claim.lock().unwrap() = result;
    }

    pub(crate) fn calls(&self) -> (usize, usize, usize) {
        (
            self.exchange_calls.load(Ordering::SeqCst),
            self.user_info_calls.load(Ordering::SeqCst),
            self.claim_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn authorization_url(&self, state: &str, nonce: &str, locale: &str, identity: bool) -> String {
        format!(
            "https://idp.test/authorize?state={state}&nonce={nonce}\
             &locale={locale}&identity={identity}"
        )
    }

    async fn exchange(&self, _code: &str, nonce: &str) -> Result<TokenResponse, OneLoginError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_nonce.lock().unwrap() = Some(nonce.to_string());
        self.exchange.lock().unwrap().clone()
    }

    async fn user_info(&self, _access_token: &str) -> Result<UserInfo, OneLoginError> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserInfo {
            sub: "urn:fdc:gov.uk:2022:sam".to_string(),
            email: "sam@example.com".to_string(),
            email_verified: true,
            core_identity_jwt: "claim".to_string(),
        })
    }

    fn parse_identity_claim(
        &self,
        _user_info: &UserInfo,
    ) -> Result<IdentityClaimResult, OneLoginError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.claim.lock().unwrap().clone()
    }

    fn end_session_url(&self, id_token: &str, post_logout_redirect: &str) -> String {
        format!(
            "https://idp.test/logout?id_token_hint={id_token}\
             &post_logout_redirect_uri={post_logout_redirect}"
        )
    }
}

/// Document-check vendor that answers from a fixed value and counts calls.
pub(crate) struct MockVendor {
    pub(crate) test_mode: bool,
    pub(crate) user_calls: AtomicUsize,
    pub(crate) last_token: Mutex<Option<String>>,
    user: Mutex<Result<IdentityClaimResult, VendorError>>,
}

impl MockVendor {
    pub(crate) fn new(test_mode: bool) -> Self {
        Self {
            test_mode,
            user_calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
            user: Mutex::new(Ok(confirmed("Vera Vendor"))),
        }
    }

    pub(crate) fn set_user(&self, result: Result<IdentityClaimResult, VendorError>) {
        *self.user.lock().unwrap() = result;
    }

    pub(crate) fn calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVendor for MockVendor {
    fn is_test(&self) -> bool {
        self.test_mode
    }

    fn sdk_id(&self) -> &str {
        "sdk-test"
    }

    fn scenario_id(&self) -> &str {
        "scenario-test"
    }

    async fn user(&self, token: &str) -> Result<IdentityClaimResult, VendorError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());
        self.user.lock().unwrap().clone()
    }
}

/// Case store that counts writes and can be told to fail them.
pub(crate) struct RecordingCaseStore {
    inner: InMemoryCaseStore,
    pub(crate) puts: AtomicUsize,
    pub(crate) fail_puts: AtomicBool,
}

impl RecordingCaseStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryCaseStore::new(),
            puts: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
        }
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaseStore for RecordingCaseStore {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<CaseRecord, StorageError> {
        self.inner.get(id).await
    }

    async fn put(&self, record: &CaseRecord) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Storage("write refused".to_string()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(record).await
    }
}

pub(crate) fn test_codec() -> SessionCodec {
    let registry = SessionRegistry::new()
        .register(SessionKind::Csrf, "csrf", 86400)
        .register(SessionKind::OneLogin, "params", 600)
        .register(SessionKind::Donor, "session", 86400)
        .register(SessionKind::CertificateProvider, "session", 86400)
        .register(SessionKind::Attorney, "session", 86400)
        .register(SessionKind::ShareCode, "shareCode", 86400)
        .register(SessionKind::Yoti, "yoti", 3600);
    SessionCodec::new(b"test-session-secret", registry).unwrap()
}

pub(crate) struct TestFlow {
    pub(crate) flow: LoginFlow,
    pub(crate) provider: Arc<MockProvider>,
    pub(crate) vendor: Arc<MockVendor>,
    pub(crate) cases: Arc<RecordingCaseStore>,
}

impl TestFlow {
    pub(crate) fn new() -> Self {
        Self::build(Arc::new(SequenceRandom(AtomicUsize::new(0))))
    }

    pub(crate) fn with_random(value: &'static str) -> Self {
        Self::build(Arc::new(FixedRandom(value)))
    }

    /// A flow whose vendor skips the widget, like the vendor's test mode.
    pub(crate) fn with_test_vendor() -> Self {
        Self::build_with(
            Arc::new(SequenceRandom(AtomicUsize::new(0))),
            Arc::new(MockVendor::new(true)),
        )
    }

    fn build(random: Arc<dyn RandomString>) -> Self {
        Self::build_with(random, Arc::new(MockVendor::new(false)))
    }

    fn build_with(random: Arc<dyn RandomString>, vendor: Arc<MockVendor>) -> Self {
        let provider = Arc::new(MockProvider::new());
        let cases = Arc::new(RecordingCaseStore::new());
        let flow = LoginFlow::new(
            provider.clone(),
            Arc::new(test_codec()),
            cases.clone(),
            Arc::new(InMemoryCacheStore::new()),
            PUBLIC_URL,
        )
        .with_random(random)
        .with_clock(Arc::new(FixedClock))
        .with_vendor(vendor.clone());

        Self {
            flow,
            provider,
            vendor,
            cases,
        }
    }

    /// Stores a case without counting it as a write by the flow.
    pub(crate) async fn seed(&self, record: CaseRecord) {
        self.cases.inner.put(&record).await.unwrap();
    }

    pub(crate) async fn case(&self, id: &str) -> CaseRecord {
        self.cases.get(id).await.unwrap()
    }
}

/// A browser signed in as `role` with session `sess-1`, bound to `case_id`
/// when it is not empty.
pub(crate) fn signed_in(t: &TestFlow, role: Role, case_id: &str) -> CookieJar {
    let mut set = HeaderMap::new();
    t.flow
        .codec
        .save_value(
            AuthenticatedSession {
                sub: format!("urn:fdc:gov.uk:2022:{role}"),
                email: format!("{role}@example.com"),
                case_id: case_id.to_string(),
                session_id: "sess-1".to_string(),
                id_token: "id-token".to_string(),
            }
            .into_role_value(role),
            &mut set,
        )
        .unwrap();

    let mut jar = CookieJar::default();
    jar.apply(&set);
    jar
}

/// A browser holding a share-code grant for `role` on `case_id`.
pub(crate) async fn with_share_code(t: &TestFlow, role: Role, case_id: &str) -> CookieJar {
    let set = t
        .flow
        .grant_share_code(role, case_id, "sess-1")
        .await
        .unwrap();
    let mut jar = CookieJar::default();
    jar.apply(&set);
    jar
}

/// Minimal browser cookie jar: applies `Set-Cookie` headers and replays
/// them as a `Cookie` header.
#[derive(Debug, Default, Clone)]
pub(crate) struct CookieJar(BTreeMap<String, String>);

impl CookieJar {
    pub(crate) fn apply(&mut self, set: &HeaderMap) -> &mut Self {
        for header in set.get_all(SET_COOKIE) {
            let cookie = header.to_str().unwrap();
            let (name, value) = cookie
                .split(';')
                .next()
                .and_then(|pair| pair.split_once('='))
                .unwrap();
            if cookie.contains("Max-Age=-1") {
                self.0.remove(name);
            } else {
                self.0.insert(name.to_string(), value.to_string());
            }
        }
        self
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub(crate) fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.0.is_empty() {
            let cookie = self
                .0
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert(COOKIE, cookie.parse().unwrap());
        }
        headers
    }
}

pub(crate) fn request_cookies(set: &HeaderMap) -> HeaderMap {
    CookieJar::default().apply(set).headers()
}
