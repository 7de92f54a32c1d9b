use std::env;
use std::sync::LazyLock;

/// Public origin of the service, used for the provider redirect URI and for
/// post-logout destinations.
pub static APP_PUBLIC_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("APP_PUBLIC_URL")
        .ok()
        .unwrap_or("http://localhost:5050".to_string())
        .trim_end_matches('/')
        .to_string()
});

/// The single redirect URI registered with the identity provider.
pub const AUTH_REDIRECT_PATH: &str = "/auth/redirect";

pub(crate) fn auth_redirect_uri(public_url: &str) -> String {
    format!("{}{AUTH_REDIRECT_PATH}", public_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_redirect_uri_ignores_trailing_slash() {
        assert_eq!(
            auth_redirect_uri("https://lpa.example/"),
            "https://lpa.example/auth/redirect"
        );
        assert_eq!(
            auth_redirect_uri("https://lpa.example"),
            "https://lpa.example/auth/redirect"
        );
    }
}
