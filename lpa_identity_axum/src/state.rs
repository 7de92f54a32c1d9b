use std::sync::Arc;

use lpa_identity::{CsrfGuard, IdentityServices, LoginFlow};

/// Shared handles for every handler and the CSRF middleware.
#[derive(Clone)]
pub struct AppState {
    pub login: Arc<LoginFlow>,
    pub csrf: Arc<CsrfGuard>,
}

impl From<IdentityServices> for AppState {
    fn from(services: IdentityServices) -> Self {
        Self {
            login: services.login,
            csrf: services.csrf,
        }
    }
}
