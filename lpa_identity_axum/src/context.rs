use axum::extract::FromRequestParts;
use http::request::Parts;

use lpa_identity::AppContext;

use super::error::ErrorPage;

/// The request context attached by [`csrf_context`](crate::csrf_context).
///
/// Extracting it on a route without that middleware is a server error.
#[derive(Debug, Clone)]
pub struct Ctx(pub AppContext);

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = ErrorPage;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AppContext>()
            .cloned()
            .map(Ctx)
            .ok_or_else(|| {
                tracing::error!("No request context, is the CSRF middleware installed?");
                ErrorPage::internal(lpa_identity::Lang::from_path(parts.uri.path()))
            })
    }
}
