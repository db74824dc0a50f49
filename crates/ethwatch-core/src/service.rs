//! The aggregation stage: sole consumer of the block channel and sole writer
//! of the per-address transaction index and the head pointer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::shutdown::ShutdownSignal;
use crate::types::{normalize_address, Block, Transaction};

// ==============================================================================
// Index State
// ==============================================================================

#[derive(Default)]
struct IndexState {
    /// Height of the last ingested block, zero before the first one.
    head: u64,
    /// Subscribed address -> matching transactions in arrival order.
    by_address: HashMap<String, Vec<Arc<Transaction>>>,
}

// ==============================================================================
// Aggregation Service
// ==============================================================================

/// In-memory address index shared between the ingestion loop and any number
/// of concurrent readers.
///
/// Ingesting a block and subscribing take the write lock; queries take the
/// read lock. No lock is held across I/O, and a block is applied inside a
/// single write section so readers never see half of it.
pub struct AggregationService {
    state: RwLock<IndexState>,
}

impl AggregationService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
        }
    }

    pub async fn current_head(&self) -> u64 {
        self.state.read().await.head
    }

    /// Transactions recorded for `address`. Unknown addresses yield an empty
    /// list, same as a subscribed address with no activity yet.
    pub async fn transactions_for(&self, address: &str) -> Vec<Arc<Transaction>> {
        self.state
            .read()
            .await
            .by_address
            .get(&normalize_address(address))
            .cloned()
            .unwrap_or_default()
    }

    /// Start indexing `address` from the next ingested block on. Idempotent;
    /// always reports success.
    pub async fn subscribe(&self, address: &str) -> bool {
        let key = normalize_address(address);
        let mut state = self.state.write().await;
        if state.by_address.contains_key(&key) {
            info!(address = %key, "address already subscribed");
        } else {
            state.by_address.insert(key.clone(), Vec::new());
            info!(address = %key, subscriptions = state.by_address.len(), "address subscribed");
        }
        true
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.by_address.len()
    }

    /// Apply one block: advance the head and append every transaction that
    /// names a subscribed address as sender or recipient. A self-transfer is
    /// appended once per role.
    pub async fn ingest(&self, block: Block) {
        let Block {
            height,
            hash,
            transactions,
        } = block;
        let transactions: Vec<Arc<Transaction>> =
            transactions.into_iter().map(Arc::new).collect();

        let mut state = self.state.write().await;
        if height < state.head {
            warn!(
                block.height = height,
                head = state.head,
                "received block below current head; head left unchanged"
            );
        } else {
            state.head = height;
        }

        let mut matched = 0usize;
        for tx in &transactions {
            if let Some(outbound) = state.by_address.get_mut(&normalize_address(&tx.from)) {
                outbound.push(Arc::clone(tx));
                matched += 1;
            }
            if let Some(to) = tx.recipient() {
                if let Some(inbound) = state.by_address.get_mut(&normalize_address(to)) {
                    inbound.push(Arc::clone(tx));
                    matched += 1;
                }
            }
        }
        drop(state);

        debug!(
            block.height = height,
            block.hash = %hash,
            transactions = transactions.len(),
            matched,
            "ingested block"
        );
    }

    /// Consume blocks until the channel closes or shutdown is triggered.
    /// Never fails: fetch errors are the poller's concern.
    pub async fn run(&self, mut blocks: mpsc::Receiver<Block>, mut shutdown: ShutdownSignal) {
        info!("aggregation service started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("aggregation service stopping on shutdown");
                    break;
                }
                received = blocks.recv() => match received {
                    Some(block) => self.ingest(block).await,
                    None => {
                        info!("block channel closed; aggregation service stopping");
                        break;
                    }
                },
            }
        }
    }
}

impl Default for AggregationService {
    fn default() -> Self {
        Self::new()
    }
}
