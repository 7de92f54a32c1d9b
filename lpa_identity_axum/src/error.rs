use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

use lpa_identity::{Lang, LoginError, SessionError};

use super::pages::{ErrorTemplate, ForbiddenTemplate};

/// An error rendered as a page in the user's language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage {
    status: StatusCode,
    lang: Lang,
}

impl ErrorPage {
    pub fn new(status: StatusCode, lang: Lang) -> Self {
        Self { status, lang }
    }

    pub fn internal(lang: Lang) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, lang)
    }

    pub fn bad_request(lang: Lang) -> Self {
        Self::new(StatusCode::BAD_REQUEST, lang)
    }

    pub fn forbidden(lang: Lang) -> Self {
        Self::new(StatusCode::FORBIDDEN, lang)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn render(&self) -> Result<String, askama::Error> {
        let welsh = self.lang == Lang::Cy;
        match self.status {
            StatusCode::FORBIDDEN => ForbiddenTemplate { welsh }.render(),
            status => ErrorTemplate {
                welsh,
                status: status.as_u16(),
                bad_request: status.is_client_error(),
            }
            .render(),
        }
    }
}

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(body) => (self.status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (self.status, self.status.to_string()).into_response()
            }
        }
    }
}

/// Helper trait for converting errors to an error page
pub(super) trait IntoResponseError<T> {
    fn into_response_error(self, lang: Lang) -> Result<T, ErrorPage>;
}

impl<T> IntoResponseError<T> for Result<T, LoginError> {
    fn into_response_error(self, lang: Lang) -> Result<T, ErrorPage> {
        self.map_err(|e| {
            let page = if e.is_csrf() {
                ErrorPage::forbidden(lang)
            } else if e.is_bad_request() {
                ErrorPage::bad_request(lang)
            } else {
                ErrorPage::internal(lang)
            };
            tracing::error!("Responding {} to: {}", page.status, e);
            page
        })
    }
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self, lang: Lang) -> Result<T, ErrorPage> {
        self.map_err(LoginError::from).into_response_error(lang)
    }
}
