use http::HeaderMap;
use std::collections::HashSet;

use crate::context::{Lang, Role};
use crate::session::SessionKind;

use super::flow::LoginFlow;

impl LoginFlow {
    /// Clears every cookie this service sets and returns the provider's
    /// end-session URL.
    ///
    /// The first role session holding an ID token supplies the token hint
    /// and decides where the provider sends the user afterwards. Clearing
    /// is best effort and never stops the redirect.
    pub fn sign_out(&self, lang: Lang, headers: &HeaderMap) -> (String, HeaderMap) {
        let (id_token, role) = Role::ALL
            .into_iter()
            .find_map(|role| match self.codec.load_authenticated(role, headers) {
                Ok(session) if !session.id_token.is_empty() => Some((session.id_token, role)),
                _ => None,
            })
            .unwrap_or_else(|| {
                tracing::debug!("No signed-in session found at sign-out");
                (String::new(), Role::Donor)
            });

        // Kinds may share a cookie; each cookie is cleared once.
        let mut out = HeaderMap::new();
        let mut cleared = HashSet::new();
        for kind in SessionKind::ALL {
            let name = match self.codec.cookie_spec(kind) {
                Ok(spec) => spec.name.clone(),
                Err(e) => {
                    tracing::warn!("No cookie to clear for {} at sign-out: {}", kind, e);
                    continue;
                }
            };
            if !cleared.insert(name) {
                continue;
            }
            if let Err(e) = self.codec.clear(kind, &mut out) {
                tracing::warn!("Failed to clear {} cookie at sign-out: {}", kind, e);
            }
        }

        let post_logout = format!("{}{}", self.public_url, lang.url(role.start_path()));
        tracing::debug!("Signing out {}, returning to {}", role, post_logout);

        (
            self.provider.end_session_url(&id_token, &post_logout),
            out,
        )
    }
}
