mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod repo;
mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;
use crate::repo::{SharedStorage, Storage};

#[derive(Clone)]
pub struct AppState {
    pub storage: SharedStorage,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load().expect("Failed to load configuration");
    let storage = Storage::new(&config.storage_dir, &config.uploads_dir);
    let state = AppState {
        storage: Arc::new(Mutex::new(storage)),
        config: Arc::new(config.clone()),
    };

    let app = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
        .route(
            "/content",
            get(handlers::list_content)
                .post(handlers::create_content)
                .put(handlers::update_content)
                .delete(handlers::delete_content),
        )
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/upload",
            post(handlers::upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/uploads/:name", get(handlers::serve_upload))
        .route(
            "/users",
            get(handlers::list_users)
                .post(handlers::create_user)
                .delete(handlers::delete_user),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await.unwrap();
    info!("Server running on http://{}", config.server_addr);
    axum::serve(listener, app).await.unwrap();
}
