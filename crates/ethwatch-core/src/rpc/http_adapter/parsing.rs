use crate::error::CoreError;
use crate::types::{Block, Transaction};

/// Decode a JSON-RPC hex quantity (`0x`-prefixed, no leading-zero rules
/// enforced) into an integer.
pub(super) fn parse_hex_quantity(value: &str, field: &str) -> Result<u64, CoreError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| {
            CoreError::InvalidBlockData(format!("{field} is not 0x-prefixed: {value:?}"))
        })?;
    if digits.is_empty() {
        return Err(CoreError::InvalidBlockData(format!(
            "{field} has no hex digits: {value:?}"
        )));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| CoreError::InvalidBlockData(format!("invalid {field} {value:?}: {e}")))
}

pub(super) fn format_hex_quantity(n: u64) -> String {
    format!("{n:#x}")
}

pub(super) fn parse_height_result(raw: &serde_json::Value) -> Result<u64, CoreError> {
    let hex = raw
        .as_str()
        .ok_or_else(|| CoreError::InvalidBlockData(format!("block number is not a string: {raw}")))?;
    parse_hex_quantity(hex, "block number")
}

/// Turn an `eth_getBlockByNumber` result into a [`Block`]. A `null` result
/// means the node does not have the block (yet).
pub(super) fn parse_block_result(
    raw: serde_json::Value,
    requested: u64,
) -> Result<Block, CoreError> {
    #[derive(serde::Deserialize)]
    struct RawBlock {
        number: String,
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        transactions: Vec<Transaction>,
    }

    if raw.is_null() {
        return Err(CoreError::InvalidBlockData(format!(
            "node returned no block at height {requested}"
        )));
    }

    let block: RawBlock = serde_json::from_value(raw)
        .map_err(|e| CoreError::InvalidBlockData(format!("invalid block object: {e}")))?;
    let height = parse_hex_quantity(&block.number, "block number")?;

    Ok(Block {
        height,
        hash: block.hash.unwrap_or_default(),
        transactions: block.transactions,
    })
}
