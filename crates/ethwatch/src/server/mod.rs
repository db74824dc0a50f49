mod block;
mod error;
mod subscribe;
mod transactions;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};

use ethwatch_core::AggregationService;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub service: Arc<AggregationService>,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

/// Build the API router. Cross-origin access is granted only when
/// `cors_origin` is set, and then only to that exact origin.
pub fn build_router(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let shared = Arc::new(state);

    let router = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/block", get(block::get_current_block))
        .route("/api/v1/transactions", get(transactions::get_transactions))
        .route("/api/v1/subscribe", post(subscribe::subscribe))
        .route("/api", any(api_not_found))
        .route("/api/{*path}", any(api_not_found));

    let router = match cors_origin {
        Some(origin) => router.layer(cors_layer(origin)),
        None => router,
    };
    router.with_state(shared)
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    // Reflect the origin only on an exact match so browsers get a clean
    // CORS rejection otherwise.
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &HeaderValue, _| *request_origin == origin,
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "head": state.service.current_head().await,
        "subscriptions": state.service.subscription_count().await,
    }))
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("API route not found".to_string())
}
