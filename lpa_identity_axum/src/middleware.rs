use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::header::SET_COOKIE;

use lpa_identity::{Lang, submitted_token};

use super::error::{ErrorPage, IntoResponseError};
use super::state::AppState;

/// Largest form body read while looking for the CSRF field.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Issues the CSRF cookie, rejects forged submissions, and attaches the
/// [`AppContext`](lpa_identity::AppContext) for the request.
///
/// On rejection the wrapped handler never runs.
pub async fn csrf_context(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let lang = Lang::from_path(req.uri().path());

    match check(&state, lang, req).await {
        Ok((req, set_cookie)) => {
            let mut response = next.run(req).await;
            if let Some(set_cookie) = set_cookie {
                for value in set_cookie.get_all(SET_COOKIE) {
                    response.headers_mut().append(SET_COOKIE, value.clone());
                }
            }
            response
        }
        Err(page) => page.into_response(),
    }
}

async fn check(
    state: &AppState,
    lang: Lang,
    req: Request,
) -> Result<(Request, Option<http::HeaderMap>), ErrorPage> {
    let (mut parts, body) = req.into_parts();

    let bytes = to_bytes(body, MAX_FORM_BYTES).await.map_err(|e| {
        tracing::warn!("Could not read request body: {}", e);
        ErrorPage::bad_request(lang)
    })?;

    let csrf = state
        .csrf
        .ensure_token(&parts.headers)
        .into_response_error(lang)?;

    let submitted = submitted_token(&parts.headers, &bytes);
    state
        .csrf
        .verify(&parts.method, &csrf.token, submitted.as_deref())
        .into_response_error(lang)?;

    let ctx = state
        .csrf
        .resolve_context(&parts.headers, lang, &csrf.token);
    tracing::debug!("Request context: role={:?} lang={:?}", ctx.role, ctx.lang);
    parts.extensions.insert(ctx);

    Ok((Request::from_parts(parts, Body::from(bytes)), csrf.set_cookie))
}
