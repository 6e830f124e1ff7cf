//! rusty-blog/crates/rb-api/src/middleware.rs Middleware
//!
//! Custom middleware and extractors for identity, logging, and traffic control.

use actix_cors::Cors;
use actix_web::dev::Payload;
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use rb_core::error::AppError;
use rb_core::models::Identity;

use crate::error::ApiError;
use crate::handlers::AppState;

// Returns a standard access logger for the Rusty-Blog API.
pub fn standard_middleware() -> Logger {
    // We use the 'default' logger which outputs:
    // remote-ip "request-line" status-code response-size "referrer" "user-agent"
    Logger::default()
}

// `/sarah/` and `/sarah` reach the same profile.
pub fn normalize_path() -> NormalizePath {
    NormalizePath::new(TrailingSlash::Trim)
}

// Configures CORS (Cross-Origin Resource Sharing)
// Important if the UI and API ever live on different subdomains.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .max_age(3600)
}

/// The identity of the caller, taken from the trusted identity header.
///
/// Authentication happens upstream. A missing header, or one naming an
/// unknown author, yields `Identity::Anonymous`.
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let username = state.as_ref().and_then(|state| {
            req.headers()
                .get(state.identity_header.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        });

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::Internal("application state not configured".into()))?;
            let identity = state.blog.resolve_identity(username.as_deref()).await?;
            Ok::<_, ApiError>(CurrentUser(identity))
        })
    }
}
