//! Routes for login, the provider redirect, the document-check vendor and sign-out

use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use lpa_identity::AUTH_REDIRECT_PATH;

use super::handlers::{auth_redirect, callback, login, sign_out, vendor_callback, vendor_start};
use super::middleware::csrf_context;
use super::state::AppState;

fn routes() -> Router<AppState> {
    Router::new()
        .route("/login/{role}", get(login))
        .route("/login/{role}/callback", get(callback).post(callback))
        .route(AUTH_REDIRECT_PATH, get(auth_redirect))
        .route("/identity-with-yoti/{role}", get(vendor_start))
        .route(
            "/identity-with-yoti/{role}/callback",
            get(vendor_callback).post(vendor_callback),
        )
        .route("/sign-out", get(sign_out))
}

/// Create the router for all login endpoints
///
/// Every route is served both as-is and under `/cy`, which selects Welsh.
/// The CSRF middleware wraps all of them.
pub fn lpa_identity_router(state: AppState) -> Router {
    lpa_identity_router_no_trace(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new()
                    .level(Level::INFO)
                    .include_headers(true),
            )
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`lpa_identity_router`] without HTTP tracing.
pub fn lpa_identity_router_no_trace(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .nest("/cy", routes())
        .layer(from_fn_with_state(state.clone(), csrf_context))
        .with_state(state)
}
