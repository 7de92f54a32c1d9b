mod context;
mod error;
mod handlers;
mod middleware;
mod pages;
mod router;
mod state;

pub use context::Ctx;
pub use error::ErrorPage;
pub use middleware::csrf_context;
pub use router::{lpa_identity_router, lpa_identity_router_no_trace};
pub use state::AppState;

pub use lpa_identity::init;
