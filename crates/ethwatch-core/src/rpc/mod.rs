//! Chain node access layer.
//!
//! Defines the [`ChainReader`] trait used by the block poller and provides an
//! HTTP JSON-RPC implementation ([`HttpChainReader`]) plus a test mock
//! (`mock::MockChainReader`).

mod http_adapter;
#[cfg(test)]
pub mod mock;

pub use http_adapter::HttpChainReader;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{CoreError, RpcError};
use crate::shutdown::ShutdownSignal;
use crate::types::Block;

/// The two node queries the poller needs.
///
/// Implementations surface transient failures as-is; retrying is the
/// caller's business.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Latest block height known to the node.
    async fn current_height(&self, ctx: &CallContext) -> Result<u64, CoreError>;

    /// Full block, with transaction objects, at `height`. The returned
    /// block's height is the node's self-reported one.
    async fn block_at(&self, ctx: &CallContext, height: u64) -> Result<Block, CoreError>;
}

// ==============================================================================
// Call Context
// ==============================================================================

/// Caller-supplied bounds for a chain request: the shutdown signal and an
/// optional absolute deadline (the poller's per-tick deadline).
#[derive(Clone)]
pub struct CallContext {
    shutdown: ShutdownSignal,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// The smaller of `limit` and the time left before the deadline.
    pub fn budget(&self, limit: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => limit.min(deadline.saturating_duration_since(Instant::now())),
            None => limit,
        }
    }

    /// Drive `request` until it completes, the budget runs out, or shutdown
    /// is triggered, whichever comes first.
    pub async fn run<F, T>(&self, limit: Duration, request: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        if self.is_cancelled() {
            return Err(RpcError::Cancelled);
        }
        let budget = self.budget(limit);
        let mut shutdown = self.shutdown.clone();

        tokio::select! {
            biased;
            _ = shutdown.triggered() => Err(RpcError::Cancelled),
            result = tokio::time::timeout(budget, request) => {
                result.unwrap_or(Err(RpcError::Timeout(budget)))
            }
        }
    }
}
