use std::env;
use std::sync::LazyLock;

pub(crate) fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default.to_string())
}

pub static CSRF_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("CSRF_COOKIE_NAME", "csrf"));

pub static LOGIN_PARAMS_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("LOGIN_PARAMS_COOKIE_NAME", "params"));

pub static SESSION_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("SESSION_COOKIE_NAME", "session"));

pub static SHARE_CODE_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("SHARE_CODE_COOKIE_NAME", "shareCode"));

pub static YOTI_COOKIE_NAME: LazyLock<String> =
    LazyLock::new(|| env_or("YOTI_COOKIE_NAME", "yoti"));

pub const CSRF_COOKIE_MAX_AGE: i64 = 86400;
pub const LOGIN_PARAMS_COOKIE_MAX_AGE: i64 = 600;
pub const SESSION_COOKIE_MAX_AGE: i64 = 86400;
pub const SHARE_CODE_COOKIE_MAX_AGE: i64 = 86400;
/// The vendor session spans the whole document-scanning journey.
pub const YOTI_COOKIE_MAX_AGE: i64 = 3600;

pub static SESSION_SECRET: LazyLock<Vec<u8>> = LazyLock::new(|| {
    match env::var("SESSION_SECRET") {
        Ok(secret) => secret.into_bytes(),
        Err(_) => {
            tracing::warn!("SESSION_SECRET not set, using the development secret");
            "default_secret_key_change_in_production"
                .to_string()
                .into_bytes()
        }
    }
});
