use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::gate::{request_session_token, LOGIN_PATH};
use crate::actions::{self, ActionOutcome, FormData, Page};
use crate::auth::SESSION_COOKIE;
use crate::init::SchemaInitializer;
use crate::pages::{self, PageState};
use crate::preferences::Preferences;
use crate::server::AppState;
use crate::{Error, ErrorClass};

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct SqlRequest {
    pub sql: Option<String>,
}

#[derive(Deserialize)]
pub struct SettingsForm {
    pub language: Option<String>,
    pub theme: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::SchemaMissing => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Configuration | ErrorClass::Operation | ErrorClass::Unexpected => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(err: Error) -> ApiError {
    tracing::error!("request failed: {}", err);
    (
        status_for(err.class()),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Generic 500 body for a handler that panicked
pub fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

// ========== Pages ==========

fn page_response(state: PageState<serde_json::Value>) -> Response {
    let status = match &state {
        PageState::Ready { .. } | PageState::NeedsInitialization { .. } => StatusCode::OK,
        PageState::Unavailable { class, .. } => match class {
            ErrorClass::Operation => StatusCode::SERVICE_UNAVAILABLE,
            other => status_for(*other),
        },
    };
    (status, Json(state)).into_response()
}

async fn render(state: &AppState, page: Page) -> Response {
    page_response(pages::view(state.store.as_ref(), &state.cache, page).await)
}

pub async fn home_page(State(state): State<Arc<AppState>>) -> Response {
    render(&state, Page::Home).await
}

pub async fn sermons_page(State(state): State<Arc<AppState>>) -> Response {
    render(&state, Page::Sermons).await
}

pub async fn meetings_page(State(state): State<Arc<AppState>>) -> Response {
    render(&state, Page::Meetings).await
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Response {
    render(&state, Page::AdminDashboard).await
}

// ========== Form Actions ==========

fn action_response(state: &AppState, outcome: ActionOutcome) -> Response {
    if outcome.success {
        state.cache.invalidate(&outcome.revalidate);
        return (StatusCode::OK, Json(outcome)).into_response();
    }
    let status = outcome
        .class
        .map(status_for)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome)).into_response()
}

pub async fn submit_prayer_request(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::submit_prayer_request(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn update_livestream(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::update_livestream(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn create_sermon(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::create_sermon(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn update_sermon(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::update_sermon(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn delete_sermon(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::delete_sermon(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn update_morning_meeting(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::update_morning_meeting(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn update_evening_meeting(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::update_evening_meeting(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

pub async fn set_prayer_request_status(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FormData>,
) -> Response {
    let outcome = actions::set_prayer_request_status(state.store.as_ref(), &form).await;
    action_response(&state, outcome)
}

// ========== Admin Session ==========

pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<FormData>) -> Response {
    match actions::sign_in(state.auth.as_ref(), &form).await {
        Ok(session) => {
            let max_age = (session.expires_at - chrono::Utc::now()).num_seconds().max(0);
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                SESSION_COOKIE, session.token, max_age
            );
            tracing::info!("admin {} signed in", session.email);
            (
                [(header::SET_COOKIE, cookie)],
                Redirect::to(DASHBOARD_PATH),
            )
                .into_response()
        }
        Err(e) => {
            let status = match e.class() {
                ErrorClass::Validation => StatusCode::BAD_REQUEST,
                ErrorClass::Operation if matches!(e, Error::Auth(_)) => StatusCode::UNAUTHORIZED,
                other => status_for(other),
            };
            (status, Json(ActionOutcome::failed(e))).into_response()
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = request_session_token(&headers) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!("sign out failed: {}", e);
        }
    }
    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    ([(header::SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response()
}

// ========== Admin Tooling ==========

pub async fn execute_sql(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SqlRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sql = request
        .sql
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "SQL query is required".to_string(),
                }),
            )
        })?;

    let result = state.store.execute_sql(sql).await.map_err(|e| {
        tracing::error!("sql execution failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    // Arbitrary SQL may touch any table
    state.cache.clear();
    Ok(Json(serde_json::json!({ "success": true, "result": result })))
}

pub async fn init_db(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = SchemaInitializer::new(state.store.as_ref())
        .with_defaults(state.seed.clone())
        .initialize()
        .await
        .map_err(api_error)?;

    state.cache.clear();
    Ok(Json(serde_json::json!({
        "success": true,
        "message": report.message(),
        "created": report.created,
        "seeded": report.seeded_livestream,
    })))
}

pub async fn check_and_seed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = SchemaInitializer::new(state.store.as_ref())
        .with_defaults(state.seed.clone())
        .check_and_seed()
        .await
        .map_err(api_error)?;

    if report.success {
        state.cache.clear();
    }
    Ok(Json(serde_json::to_value(&report).map_err(|e| api_error(e.into()))?))
}

pub async fn schema_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = SchemaInitializer::new(state.store.as_ref())
        .status()
        .await
        .map_err(api_error)?;

    Ok(Json(serde_json::json!({
        "ready": status.all_present(),
        "tables": status.tables,
    })))
}

// ========== Settings ==========

fn preferences_from(headers: &HeaderMap) -> Preferences {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(Preferences::from_cookie_header)
        .unwrap_or_default()
}

pub async fn get_settings(headers: HeaderMap) -> Json<Preferences> {
    Json(preferences_from(&headers))
}

pub async fn save_settings(headers: HeaderMap, Form(form): Form<SettingsForm>) -> Response {
    let mut prefs = preferences_from(&headers);
    if let Err(e) = prefs.apply(form.language.as_deref(), form.theme.as_deref()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }
    ([(header::SET_COOKIE, prefs.to_set_cookie())], Json(prefs)).into_response()
}
