pub mod admin;
pub mod auth;
pub mod contact;
pub mod dashboard;
pub mod error;
pub mod gallery;
pub mod listings;
pub mod media;
pub mod middleware;
pub mod rate_limit;
pub mod validate;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use tower_http::services::ServeDir;
use tracing::error;

use scholarify_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// The server's local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Runs a database call on the blocking pool.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}

/// Every route of the site. Logging and CORS layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(listings::home))
        .route("/health", get(health))
        .route("/accounts/signup", post(auth::signup))
        .route("/accounts/login", post(auth::login))
        .route("/listings", get(listings::list_listings))
        .route("/listings/{id}", get(listings::listing_detail))
        .route("/gallery", get(gallery::gallery_index))
        .route("/gallery/{id}", get(gallery::gallery_detail))
        .route("/gallery/{id}/like", post(gallery::toggle_like))
        .route("/contact", post(contact::submit_contact));

    let protected_routes = Router::new()
        .route("/accounts/logout", post(auth::logout))
        .route("/accounts/me", get(auth::me))
        .route("/accounts/saved-listings", get(auth::saved_listings))
        .route("/listings/{id}/save", post(listings::toggle_save))
        .route_layer(from_fn(middleware::require_auth));

    let staff_routes = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/admin/listings", get(admin::list_listings).post(admin::create_listing))
        .route(
            "/admin/listings/{id}",
            patch(admin::update_listing).delete(admin::delete_listing),
        )
        .route(
            "/admin/media",
            post(media::upload_media).layer(DefaultBodyLimit::max(media::MAX_MEDIA_SIZE)),
        )
        .route("/admin/gallery", get(admin::list_gallery).post(admin::create_gallery_image))
        .route("/admin/gallery/publish", post(admin::publish_gallery))
        .route(
            "/admin/gallery/{id}",
            patch(admin::update_gallery_image).delete(admin::delete_gallery_image),
        )
        .route("/admin/messages", get(admin::list_messages))
        .route("/admin/messages/actions", post(admin::message_actions))
        .route("/admin/messages/{id}", get(admin::open_message))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_staff))
        .route_layer(from_fn(middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(staff_routes)
        .nest_service("/media", ServeDir::new(&state.media_dir))
        .layer(from_fn_with_state(state.clone(), middleware::resolve_auth))
        .layer(from_fn_with_state(state.clone(), middleware::session))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
