use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::AppError;
use super::SharedState;

#[derive(Deserialize)]
pub(super) struct SubscribeRequest {
    address: String,
}

#[derive(Serialize)]
pub(super) struct SubscribeResponse {
    data: bool,
}

/// The body is decoded as JSON whatever its declared content type, so plain
/// `curl -d` requests work.
pub(super) async fn subscribe(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<SubscribeResponse>, AppError> {
    let invalid = || AppError::BadRequest("invalid subscribe request".to_string());

    let request: SubscribeRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::debug!(%err, "rejected subscribe body");
        invalid()
    })?;
    let address = request.address.trim();
    if address.is_empty() {
        return Err(invalid());
    }

    let data = state.service.subscribe(address).await;
    Ok(Json(SubscribeResponse { data }))
}
