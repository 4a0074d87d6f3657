//! Router assembly for the Cubicle server.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::{auth, blog, config::HttpOptions, exec, state::AppState};

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the application router.
///
/// Sessions live in memory and end when the browser closes. Cross-origin
/// access applies only to the JSON code endpoints, and only for the listed
/// origins.
pub fn create_router(state: AppState, http: &HttpOptions) -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(http.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnSessionEnd);

    let classroom = Router::new()
        .route("/exec2", post(exec::exec_json))
        .route("/class", get(exec::list_snapshots))
        .route("/class/save", post(exec::save_snapshot))
        .route("/class/{name}", get(exec::load_snapshot))
        .layer(cors_layer(&http.allowed_origins));

    Router::new()
        .route("/", get(blog::index))
        .route("/create", get(blog::create_form).post(blog::create))
        .route("/{id}", get(blog::show))
        .route("/{id}/update", get(blog::update_form).post(blog::update))
        .route("/{id}/delete", post(blog::delete))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/admin", get(auth::admin))
        .route("/exec", post(exec::exec_text))
        .route("/health", get(health))
        .merge(classroom)
        .with_state(state)
        .layer(sessions)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /health`: liveness probe.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
