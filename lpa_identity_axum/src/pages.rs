use askama::Template;
use axum::response::Html;

use lpa_identity::Lang;

use super::error::ErrorPage;

#[derive(Template)]
#[template(path = "login_callback.html")]
pub(super) struct LoginCallbackTemplate<'a> {
    pub(super) welsh: bool,
    pub(super) full_name: &'a str,
    pub(super) confirmed_on: String,
    pub(super) action: String,
    pub(super) csrf_field: &'a str,
    pub(super) csrf_token: &'a str,
}

#[derive(Template)]
#[template(path = "could_not_confirm.html")]
pub(super) struct CouldNotConfirmTemplate<'a> {
    pub(super) welsh: bool,
    pub(super) restart_path: &'a str,
}

#[derive(Template)]
#[template(path = "identity_with_yoti.html")]
pub(super) struct IdentityWithYotiTemplate<'a> {
    pub(super) welsh: bool,
    pub(super) sdk_id: &'a str,
    pub(super) scenario_id: &'a str,
    pub(super) callback_url: &'a str,
}

#[derive(Template)]
#[template(path = "error.html")]
pub(super) struct ErrorTemplate {
    pub(super) welsh: bool,
    pub(super) status: u16,
    pub(super) bad_request: bool,
}

#[derive(Template)]
#[template(path = "forbidden.html")]
pub(super) struct ForbiddenTemplate {
    pub(super) welsh: bool,
}

pub(super) fn render(template: &impl Template, lang: Lang) -> Result<Html<String>, ErrorPage> {
    template.render().map(Html).map_err(|e| {
        tracing::error!("Failed to render page: {}", e);
        ErrorPage::internal(lang)
    })
}
