use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::SharedState;

#[derive(Serialize)]
pub(super) struct BlockResponse {
    data: u64,
}

/// Height of the last block the index has ingested; zero before the first.
pub(super) async fn get_current_block(State(state): State<SharedState>) -> Json<BlockResponse> {
    let data = state.service.current_head().await;
    Json(BlockResponse { data })
}
