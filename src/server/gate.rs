//! Session gate for the admin dashboard

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;

use super::routes::ErrorResponse;
use super::AppState;
use crate::auth::session_token_from_cookies;
use crate::ErrorClass;

pub const LOGIN_PATH: &str = "/admin";

/// Session token from the request's `Cookie` header
pub fn request_session_token(request_headers: &axum::http::HeaderMap) -> Option<String> {
    request_headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(session_token_from_cookies)
        .map(str::to_string)
}

/// Let the request through only with a live admin session; otherwise
/// redirect (303) to the login page.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = request_session_token(request.headers()) else {
        tracing::debug!("no session cookie for {}", request.uri().path());
        return Redirect::to(LOGIN_PATH).into_response();
    };

    match state.auth.session_user(&token).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) if e.class() == ErrorClass::Configuration => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("session check failed: {}", e);
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
