use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use http::{HeaderMap, Method, StatusCode, header::LOCATION};

use lpa_identity::{
    AppContext, CSRF_FORM_FIELD, CallbackOutcome, CallbackQuery, LoginError, LoginQuery, Role,
    VendorCallbackQuery, VendorStart,
};

use super::context::Ctx;
use super::error::{ErrorPage, IntoResponseError};
use super::pages::{
    CouldNotConfirmTemplate, IdentityWithYotiTemplate, LoginCallbackTemplate, render,
};
use super::state::AppState;

/// `302 Found` with any cookies the flow wants set.
fn found(location: &str, headers: HeaderMap) -> Response {
    (StatusCode::FOUND, headers, [(LOCATION, location.to_string())]).into_response()
}

fn parse_role(role: &str) -> Result<Role, LoginError> {
    role.parse().map_err(|_| LoginError::InvalidRole(role.to_string()))
}

pub(super) async fn login(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ErrorPage> {
    let role = parse_role(&role).into_response_error(ctx.lang)?;
    let (auth_url, headers) = state
        .login
        .start(role, &ctx, &headers, &query)
        .into_response_error(ctx.lang)?;

    Ok(found(&auth_url, headers))
}

pub(super) async fn auth_redirect(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ErrorPage> {
    let location = state
        .login
        .dispatch_redirect(&headers, &query)
        .into_response_error(ctx.lang)?;

    Ok(found(&location, HeaderMap::new()))
}

pub(super) async fn callback(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ErrorPage> {
    let role = parse_role(&role).into_response_error(ctx.lang)?;
    let outcome = state
        .login
        .callback(role, &ctx, &method, &headers, &query)
        .await
        .into_response_error(ctx.lang)?;

    render_outcome(role, &ctx, outcome, ctx.lang.url(&role.callback_path()))
}

pub(super) async fn vendor_start(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ErrorPage> {
    let role = parse_role(&role).into_response_error(ctx.lang)?;
    let start = state
        .login
        .vendor_start(role, &ctx, &headers)
        .await
        .into_response_error(ctx.lang)?;

    match start {
        VendorStart::Redirect { location, headers } => Ok(found(&location, headers)),
        VendorStart::Widget {
            sdk_id,
            scenario_id,
            callback_url,
            headers,
        } => {
            let page = render(
                &IdentityWithYotiTemplate {
                    welsh: ctx.lang == lpa_identity::Lang::Cy,
                    sdk_id: &sdk_id,
                    scenario_id: &scenario_id,
                    callback_url: &callback_url,
                },
                ctx.lang,
            )?;
            Ok((headers, page).into_response())
        }
    }
}

pub(super) async fn vendor_callback(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(role): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<VendorCallbackQuery>,
) -> Result<Response, ErrorPage> {
    let role = parse_role(&role).into_response_error(ctx.lang)?;
    let outcome = state
        .login
        .vendor_callback(role, &ctx, &method, &headers, &query)
        .await
        .into_response_error(ctx.lang)?;

    render_outcome(role, &ctx, outcome, ctx.lang.url(&role.vendor_callback_path()))
}

/// Shows the result of either identity route. `action` is where the
/// confirmation page posts to continue.
fn render_outcome(
    role: Role,
    ctx: &AppContext,
    outcome: CallbackOutcome,
    action: String,
) -> Result<Response, ErrorPage> {
    let welsh = ctx.lang == lpa_identity::Lang::Cy;
    match outcome {
        CallbackOutcome::Confirmed {
            full_name,
            confirmed_at,
            headers,
        } => {
            let page = render(
                &LoginCallbackTemplate {
                    welsh,
                    full_name: &full_name,
                    confirmed_on: confirmed_at.format("%-d %B %Y").to_string(),
                    action,
                    csrf_field: CSRF_FORM_FIELD,
                    csrf_token: &ctx.csrf_token,
                },
                ctx.lang,
            )?;
            Ok((headers, page).into_response())
        }
        CallbackOutcome::CouldNotConfirm { restart_path } => Ok(render(
            &CouldNotConfirmTemplate {
                welsh,
                restart_path: &restart_path,
            },
            ctx.lang,
        )?
        .into_response()),
        CallbackOutcome::Redirect { location, headers } => {
            tracing::debug!("{} continues to {}", role, location);
            Ok(found(&location, headers))
        }
    }
}

pub(super) async fn sign_out(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Response {
    let (location, headers) = state.login.sign_out(ctx.lang, &headers);
    found(&location, headers)
}
