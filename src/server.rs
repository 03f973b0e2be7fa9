//! Inbound HTTP surface
//!
//! `GET /api/news` proxies top headlines so the news key never reaches the
//! browser. `POST /api/subscribe` accepts a push subscription.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::data::NewsClient;

/// Shared state for the route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub news: NewsClient,
}

/// Builds the router with all API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/news", get(news_handler))
        .route("/api/subscribe", post(subscribe_handler))
        .with_state(state)
}

/// Binds `addr` and serves the API until the process exits
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state)).await
}

async fn news_handler(State(state): State<AppState>) -> Response {
    match state.news.top_headlines().await {
        Ok(articles) => Json(articles).into_response(),
        Err(e) => {
            error!(error = %e, "error fetching news");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch news" })),
            )
                .into_response()
        }
    }
}

// Subscriptions are acknowledged but not stored
async fn subscribe_handler(Json(subscription): Json<Value>) -> Json<Value> {
    info!(endpoint = subscription["endpoint"].as_str().unwrap_or("unknown"), "subscription received");
    Json(json!({ "message": "Subscription received" }))
}
