use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Local;
use serde::Deserialize;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::loader::{FeedLoader, LoadError};
use crate::render::{render_articles, render_page};
use crate::sources::ALL_SOURCES;

pub struct AppState {
    pub loader: Arc<FeedLoader>,
}

pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/articles", get(articles))
        .route("/health", get(health))
        .route_service("/items.json", ServeFile::new(&config.output))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Custom error type
pub enum AppError {
    Load(LoadError),
    Render(askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Load(err) => {
                error!("Failed to load feed document: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not load articles. Try again shortly.",
                )
                    .into_response()
            }
            AppError::Render(err) => {
                error!("Failed to render template: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to render template: {}", err),
                )
                    .into_response()
            }
        }
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::Load(err)
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Render(err)
    }
}

#[derive(Deserialize)]
pub struct FilterQuery {
    pub source: Option<String>,
}

impl FilterQuery {
    fn source(&self) -> &str {
        self.source
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(ALL_SOURCES)
    }
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.loader.load().await?;
    Ok(Html(render_page(&doc, query.source(), &Local)?))
}

/// Card list only; requested by the source dropdown on change.
pub async fn articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.loader.load().await?;
    Ok(Html(render_articles(&doc.items, query.source(), &Local)?))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
