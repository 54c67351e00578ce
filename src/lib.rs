pub mod assistant;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod listings;
pub mod presence;

use axum::{Json, Router, debug_handler, extract::{FromRef, FromRequest, State, rejection::JsonRejection}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

use assistant::Assistant;
use chat::{ConnectionSettings, Relay};
use config::Config;
use presence::PresenceRegistry;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub registry: PresenceRegistry,
    pub relay: Relay,
    pub connections: ConnectionSettings,
    pub assistant: Assistant,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: &Config) -> AppState {
        let registry = PresenceRegistry::new();
        AppState {
            relay: Relay::new(db_pool.clone(), registry.clone()),
            db_pool,
            registry,
            connections: ConnectionSettings {
                outbound_capacity: config.outbound_capacity,
                auth_timeout: config.auth_timeout,
            },
            assistant: Assistant::new(config.gemini_api_key.clone()),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(assistant::chat))
        .merge(chat::router())
        .merge(listings::router())
        .merge(auth::router())
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}

#[debug_handler(state = AppState)]
async fn health(State(registry): State<PresenceRegistry>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "online": registry.len() }))
}

/// `Json` body extractor whose rejections answer like any other validation
/// failure.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use error::Error;

        let (status, message) = match self.0.downcast_ref::<Error>() {
            Some(Error::Validation(message)) => (StatusCode::BAD_REQUEST, message.clone()),
            Some(Error::NotClaimable) => (StatusCode::NOT_FOUND, Error::NotClaimable.to_string()),
            _ => {
                tracing::error!(error = ?self.0, "request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server error", "error": self.0.to_string() })),
                )
                    .into_response();
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(error::Error);
apperr_impl!(sqlx::Error);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(error::Error::Validation(rejection.body_text()))
    }
}
