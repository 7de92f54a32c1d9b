use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    middleware::from_fn_with_state,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use dotenvy::dotenv;

use lpa_identity_axum::{AppState, Ctx, ErrorPage, csrf_context, lpa_identity_router};

mod server;

use server::{init_tracing, serve_http};

const DEFAULT_PORT: u16 = 5050;

async fn index() -> Html<&'static str> {
    Html(
        r#"<h1>Make a lasting power of attorney</h1>
<ul>
  <li><a href="/login/donor">Sign in as the donor</a></li>
  <li><a href="/login/attorney">Sign in as an attorney</a></li>
  <li><a href="/cy/login/attorney">Mewngofnodi fel atwrnai</a></li>
  <li><a href="/sign-out">Sign out</a></li>
</ul>"#,
    )
}

/// Where a donor lands after signing in without a case.
async fn dashboard(Ctx(ctx): Ctx) -> Html<String> {
    let confirm = match ctx.case_id.as_deref() {
        Some(id) => format!(
            r#"<p>LPA {id}</p>
<ul>
  <li><a href="/login/donor">Confirm your identity with GOV.UK One Login</a></li>
  <li><a href="/identity-with-yoti/donor">Confirm your identity with Yoti</a></li>
</ul>"#
        ),
        None => String::new(),
    };

    Html(format!(
        r#"<h1>Your LPAs</h1>
{confirm}
<form method="post" action="/dashboard">
  <input type="hidden" name="csrf" value="{}">
  <button type="submit">Start a new LPA</button>
</form>"#,
        ctx.csrf_token
    ))
}

async fn start_lpa(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<Response, ErrorPage> {
    let (case_id, set_cookie) = state.login.create_case(&headers).await.map_err(|e| {
        tracing::warn!("Could not start an LPA: {}", e);
        ErrorPage::bad_request(ctx.lang)
    })?;

    tracing::info!("Donor started LPA {}", case_id);
    Ok((set_cookie, Redirect::to("/dashboard")).into_response())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    init_tracing(env!("CARGO_CRATE_NAME"));

    let state = AppState::from(lpa_identity_axum::init().await?);
    let donor = Router::new()
        .route("/dashboard", get(dashboard).post(start_lpa))
        .layer(from_fn_with_state(state.clone(), csrf_context))
        .with_state(state.clone());

    let app = Router::new()
        .route("/", get(index))
        .merge(donor)
        .merge(lpa_identity_router(state));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    serve_http(port, app).await?;
    Ok(())
}
