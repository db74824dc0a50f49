//! Shared test helpers for `ethwatch-core` unit tests.
//!
//! Builders for blocks and transactions so that tests across modules share a
//! single source of truth for dummy data construction.

use crate::types::{Block, Transaction};

// ==============================================================================
// Transaction Builders
// ==============================================================================

/// A plain value transfer between two addresses.
pub fn transfer(from: &str, to: &str) -> Transaction {
    Transaction {
        hash: None,
        block_number: None,
        from: from.to_owned(),
        to: Some(to.to_owned()),
        value: "0x1".to_owned(),
        gas: "0x5208".to_owned(),
        gas_price: "0x3b9aca00".to_owned(),
        input: "0x".to_owned(),
    }
}

/// A contract deployment: no recipient.
pub fn contract_creation(from: &str) -> Transaction {
    Transaction {
        to: None,
        value: "0x0".to_owned(),
        input: "0x6080604052".to_owned(),
        ..transfer(from, "")
    }
}

// ==============================================================================
// Block Builders
// ==============================================================================

/// A block at `height` with a hash derived from the height.
pub fn make_block(height: u64, transactions: Vec<Transaction>) -> Block {
    Block {
        height,
        hash: format!("0x{height:064x}"),
        transactions,
    }
}
