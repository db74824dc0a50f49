use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ethwatch_core::Transaction;

use super::error::AppError;
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Deserialize)]
pub(super) struct TransactionsQuery {
    address: Option<String>,
}

/// Wire form of an indexed transaction, using the node's field names.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TransactionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_number: Option<String>,
    from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<String>,
    value: String,
    gas: String,
    gas_price: String,
    input: String,
}

impl From<&Transaction> for TransactionRecord {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: tx.hash.clone(),
            block_number: tx.block_number.clone(),
            from: tx.from.clone(),
            to: tx.recipient().map(str::to_owned),
            value: tx.value.clone(),
            gas: tx.gas.clone(),
            gas_price: tx.gas_price.clone(),
            input: tx.input.clone(),
        }
    }
}

#[derive(Serialize)]
pub(super) struct TransactionsResponse {
    data: Vec<TransactionRecord>,
}

// ==============================================================================
// Handler
// ==============================================================================

pub(super) async fn get_transactions(
    State(state): State<SharedState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let address = query
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("required address field missing".to_string()))?;

    let data = state
        .service
        .transactions_for(address)
        .await
        .iter()
        .map(|tx| TransactionRecord::from(tx.as_ref()))
        .collect();

    Ok(Json(TransactionsResponse { data }))
}
