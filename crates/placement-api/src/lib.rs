pub mod applications;
pub mod auth;
pub mod documents;
pub mod drives;
pub mod error;
pub mod middleware;
pub mod students;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tracing::error;

use placement_db::Database;
use placement_engine::notifier::NotificationQueue;
use placement_engine::storage::ObjectStore;

pub use error::ApiError;

use crate::middleware::{require_admin, require_auth, require_student};

/// Upper bound for document uploads and CSV imports.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub reset_code_ttl: chrono::Duration,
    pub store: Arc<dyn ObjectStore>,
    pub notifications: NotificationQueue,
}

impl AppStateInner {
    /// Run a synchronous engine call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> placement_engine::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(ApiError::from)
    }
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/logout", post(auth::logout));

    let shared = Router::new()
        .route("/api/v1/drives", get(drives::list_drives))
        .route("/api/v1/drives/home", get(drives::home_page));

    let student = Router::new()
        .route("/api/v1/drives/{id}/apply", post(applications::apply))
        .route("/api/v1/drives/{id}/withdraw", post(applications::withdraw))
        .route("/api/v1/student/applications", get(applications::my_applications))
        .route("/api/v1/student/profile", put(students::update_profile))
        .route("/api/v1/student/upload", post(documents::upload))
        .route_layer(from_fn(require_student));

    let admin = Router::new()
        .route("/api/v1/admin/drives", post(drives::create_drive))
        .route(
            "/api/v1/admin/drives/{id}",
            put(drives::update_drive).delete(drives::delete_drive),
        )
        .route("/api/v1/admin/drives/{id}/status", put(drives::set_drive_status))
        .route(
            "/api/v1/admin/drives/{id}/applications",
            get(applications::drive_applications),
        )
        .route("/api/v1/admin/drives/{id}/add-student", post(applications::add_student))
        .route("/api/v1/admin/applications/status", put(applications::update_status))
        .route("/api/v1/admin/students/bulk-upload", post(students::bulk_upload))
        .route("/api/v1/admin/students", get(students::list_students))
        .route("/api/v1/admin/students/bulk", delete(students::bulk_delete))
        .route("/api/v1/admin/students/{id}", delete(students::delete_student))
        .route("/api/v1/admin/users/{id}/block", put(students::set_blocked))
        .route_layer(from_fn(require_admin));

    let protected = Router::new()
        .merge(shared)
        .merge(student)
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.run(|db| Ok(db.ping()?)).await?;
    Ok(Json(json!({ "status": "ok" })))
}
