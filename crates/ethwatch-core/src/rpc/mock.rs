use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CoreError, RpcError};
use crate::types::Block;

use super::{CallContext, ChainReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderCall {
    CurrentHeight,
    BlockAt(u64),
}

/// A mock chain reader for testing. Serves canned blocks from a `HashMap`
/// populated via the builder pattern and records every call it receives.
pub struct MockChainReader {
    head: Mutex<Option<u64>>,
    blocks: HashMap<u64, Block>,
    failing_heights: HashSet<u64>,
    calls: Mutex<Vec<ReaderCall>>,
}

impl MockChainReader {
    pub fn builder() -> MockChainReaderBuilder {
        MockChainReaderBuilder {
            head: Some(0),
            blocks: HashMap::new(),
            failing_heights: HashSet::new(),
        }
    }

    /// Change the height reported by `current_height`.
    pub fn set_head(&self, height: u64) {
        *self.head.lock().expect("mock head lock poisoned") = Some(height);
    }

    /// Make `current_height` fail with a transport timeout.
    pub fn fail_head(&self) {
        *self.head.lock().expect("mock head lock poisoned") = None;
    }

    pub fn calls(&self) -> Vec<ReaderCall> {
        self.calls.lock().expect("mock calls lock poisoned").clone()
    }

    /// Heights requested through `block_at`, in call order.
    pub fn block_requests(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ReaderCall::BlockAt(height) => Some(height),
                ReaderCall::CurrentHeight => None,
            })
            .collect()
    }

    fn record(&self, call: ReaderCall) {
        self.calls
            .lock()
            .expect("mock calls lock poisoned")
            .push(call);
    }
}

pub struct MockChainReaderBuilder {
    head: Option<u64>,
    blocks: HashMap<u64, Block>,
    failing_heights: HashSet<u64>,
}

impl MockChainReaderBuilder {
    pub fn with_head(mut self, height: u64) -> Self {
        self.head = Some(height);
        self
    }

    pub fn with_unreachable_head(mut self) -> Self {
        self.head = None;
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.insert(block.height, block);
        self
    }

    /// `block_at(height)` answers with a JSON-RPC server error.
    pub fn with_failing_block(mut self, height: u64) -> Self {
        self.failing_heights.insert(height);
        self
    }

    pub fn build(self) -> MockChainReader {
        MockChainReader {
            head: Mutex::new(self.head),
            blocks: self.blocks,
            failing_heights: self.failing_heights,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn current_height(&self, ctx: &CallContext) -> Result<u64, CoreError> {
        self.record(ReaderCall::CurrentHeight);
        if ctx.is_cancelled() {
            return Err(RpcError::Cancelled.into());
        }
        let head = *self.head.lock().expect("mock head lock poisoned");
        head.ok_or_else(|| RpcError::Timeout(Duration::from_millis(2000)).into())
    }

    async fn block_at(&self, ctx: &CallContext, height: u64) -> Result<Block, CoreError> {
        self.record(ReaderCall::BlockAt(height));
        if ctx.is_cancelled() {
            return Err(RpcError::Cancelled.into());
        }
        if self.failing_heights.contains(&height) {
            return Err(RpcError::ServerError {
                code: -32000,
                message: format!("header not found for {height:#x}"),
            }
            .into());
        }
        self.blocks.get(&height).cloned().ok_or_else(|| {
            CoreError::InvalidBlockData(format!("node returned no block at height {height}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::Shutdown;
    use crate::test_util::*;

    #[tokio::test]
    async fn serves_blocks_and_records_calls() {
        let rpc = MockChainReader::builder()
            .with_head(0x11)
            .with_block(make_block(0x11, vec![transfer("0xa", "0xb")]))
            .build();
        let shutdown = Shutdown::new();
        let ctx = CallContext::new(shutdown.signal());

        assert_eq!(rpc.current_height(&ctx).await.expect("head"), 0x11);
        let block = rpc.block_at(&ctx, 0x11).await.expect("block");
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(
            rpc.calls(),
            vec![ReaderCall::CurrentHeight, ReaderCall::BlockAt(0x11)]
        );
    }

    #[tokio::test]
    async fn failures_have_expected_classes() {
        let rpc = MockChainReader::builder()
            .with_unreachable_head()
            .with_failing_block(3)
            .build();
        let shutdown = Shutdown::new();
        let ctx = CallContext::new(shutdown.signal());

        assert!(rpc.current_height(&ctx).await.expect_err("head").is_transport());
        assert!(rpc.block_at(&ctx, 3).await.expect_err("failing").is_protocol());
        assert!(rpc.block_at(&ctx, 4).await.expect_err("missing").is_protocol());
    }
}
