//! Domain types shared by the reader, poller and aggregation service.
//!
//! `Transaction` deserializes directly from the node's transaction objects;
//! `Block` is only ever built by a `ChainReader` once the node's hex height
//! has been decoded.

use serde::Deserialize;

// ==============================================================================
// Transaction
// ==============================================================================

/// A transaction as reported by the node. All value-like fields are opaque
/// strings and are passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    pub from: String,
    /// Absent for contract-creation transactions.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub gas: String,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default)]
    pub input: String,
}

impl Transaction {
    /// Recipient, treating an empty `to` the same as a missing one.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }
}

// ==============================================================================
// Block
// ==============================================================================

/// A fully fetched block with its decimal height already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub height: u64,
    pub hash: String,
    pub transactions: Vec<Transaction>,
}

// ==============================================================================
// Addresses
// ==============================================================================

/// Canonical form used as the address index key. Hex addresses are
/// case-insensitive, so checksummed and lowercase spellings collapse.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}
