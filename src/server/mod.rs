use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthProvider;
use crate::config::Backend;
use crate::init::SeedDefaults;
use crate::pages::PageCache;
use crate::storage::RecordStore;
use crate::ui::Icons;

pub mod gate;
pub mod routes;

/// Server state
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub cache: PageCache,
    pub seed: SeedDefaults,
}

impl AppState {
    pub fn new(backend: Backend) -> Self {
        Self {
            store: backend.store,
            auth: backend.auth,
            cache: PageCache::new(),
            seed: SeedDefaults::default(),
        }
    }

    pub fn with_seed(mut self, seed: SeedDefaults) -> Self {
        self.seed = seed;
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .route("/admin/dashboard", get(routes::dashboard))
        .route("/admin/dashboard/livestream", post(routes::update_livestream))
        .route("/admin/dashboard/sermons", post(routes::create_sermon))
        .route("/admin/dashboard/sermons/update", post(routes::update_sermon))
        .route("/admin/dashboard/sermons/delete", post(routes::delete_sermon))
        .route("/admin/dashboard/meetings/morning", post(routes::update_morning_meeting))
        .route("/admin/dashboard/meetings/evening", post(routes::update_evening_meeting))
        .route(
            "/admin/dashboard/prayer-requests/status",
            post(routes::set_prayer_request_status),
        )
        .route("/api/execute-sql", post(routes::execute_sql))
        .route_layer(middleware::from_fn_with_state(state.clone(), gate::require_session));

    Router::new()
        .route("/api/pages/home", get(routes::home_page))
        .route("/api/pages/sermons", get(routes::sermons_page))
        .route("/api/pages/meetings", get(routes::meetings_page))
        .route("/api/prayer-requests", post(routes::submit_prayer_request))
        .route("/api/init-db", get(routes::init_db).post(routes::init_db))
        .route("/api/check-and-seed", get(routes::check_and_seed))
        .route("/api/schema-status", get(routes::schema_status))
        .route("/admin", post(routes::login))
        .route("/admin/logout", post(routes::logout))
        .route("/settings", get(routes::get_settings).post(routes::save_settings))
        .merge(gated)
        .layer(CatchPanicLayer::custom(routes::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(bind: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind.parse()?;
    let app = router(Arc::new(state));

    tracing::info!("Starting server on {}", addr);
    println!("{} Server running at http://{}", Icons::GLOBE, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
