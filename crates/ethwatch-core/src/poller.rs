//! Block poller: detects new blocks on the node and streams them, in height
//! order and without gaps, onto a bounded channel.
//!
//! Each tick refreshes the node's head and then fetches every pending height
//! sequentially. Any failure abandons the rest of the tick; the cursor stays
//! at the last block handed off, so the next tick resumes from there. That
//! re-poll is the only retry mechanism.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::rpc::{CallContext, ChainReader};
use crate::shutdown::ShutdownSignal;
use crate::types::Block;

// ==============================================================================
// Configuration
// ==============================================================================

/// Which block is streamed first after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    /// Position the cursor one below the startup head, so the block that is
    /// current at startup is the first one streamed.
    #[default]
    ResumeAtHead,
    /// Position the cursor on the startup head; only blocks produced after
    /// startup are streamed.
    AfterHead,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    /// Budget for all chain requests within one tick.
    pub tick_deadline: Duration,
    pub start_policy: StartPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            tick_deadline: Duration::from_secs(5),
            start_policy: StartPolicy::default(),
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "poll interval must be non-zero".to_owned(),
            ));
        }
        if self.tick_deadline.is_zero() {
            return Err(CoreError::InvalidConfig(
                "tick deadline must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }
}

// ==============================================================================
// Cursor
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerCursor {
    /// Height of the last block handed to the channel; `None` when nothing
    /// below the next height exists (startup at genesis).
    pub last_fetched: Option<u64>,
    /// Head most recently reported by the node.
    pub next_observed: u64,
}

impl PollerCursor {
    pub fn at_startup(head: u64, policy: StartPolicy) -> Self {
        let last_fetched = match policy {
            StartPolicy::ResumeAtHead => head.checked_sub(1),
            StartPolicy::AfterHead => Some(head),
        };
        Self {
            last_fetched,
            next_observed: head,
        }
    }

    pub fn next_height(&self) -> u64 {
        self.last_fetched.map_or(0, |h| h.saturating_add(1))
    }

    /// Heights still to fetch; empty once caught up.
    pub fn pending(&self) -> RangeInclusive<u64> {
        self.next_height()..=self.next_observed
    }
}

// ==============================================================================
// Tick Results
// ==============================================================================

#[derive(Debug)]
pub enum TickOutcome {
    /// Every pending block was handed off (possibly none).
    CaughtUp,
    /// The head refresh failed; nothing was fetched.
    HeadUnavailable(CoreError),
    /// Fetching `height` failed; blocks below it were already handed off.
    FetchFailed { height: u64, error: CoreError },
    Cancelled,
    /// The consumer is gone.
    ChannelClosed,
}

#[derive(Debug)]
pub struct TickReport {
    pub pushed: usize,
    pub outcome: TickOutcome,
}

impl TickReport {
    fn new(pushed: usize, outcome: TickOutcome) -> Self {
        Self { pushed, outcome }
    }
}

// ==============================================================================
// Poller
// ==============================================================================

pub struct BlockPoller<R: ChainReader + ?Sized> {
    reader: Arc<R>,
    output: mpsc::Sender<Block>,
    config: PollerConfig,
    cursor: PollerCursor,
    shutdown: ShutdownSignal,
}

impl<R: ChainReader + ?Sized> BlockPoller<R> {
    /// Query the node's head and position the cursor. Failing to learn the
    /// head is fatal: nothing downstream can start without it.
    pub async fn start(
        reader: Arc<R>,
        output: mpsc::Sender<Block>,
        config: PollerConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        info!("starting block poller");

        let ctx = CallContext::new(shutdown.clone());
        let head = reader
            .current_height(&ctx)
            .await
            .map_err(|e| CoreError::Startup(Box::new(e)))?;
        let cursor = PollerCursor::at_startup(head, config.start_policy);
        info!(
            head,
            next_height = cursor.next_height(),
            policy = ?config.start_policy,
            "block poller positioned"
        );

        Ok(Self {
            reader,
            output,
            config,
            cursor,
            shutdown,
        })
    }

    pub fn cursor(&self) -> PollerCursor {
        self.cursor
    }

    /// Tick on the configured interval until shutdown or until the consumer
    /// goes away. Returns without error in both cases.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // First tick is immediate

        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("block poller stopping on shutdown");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let report = self.tick().await;
            match report.outcome {
                TickOutcome::Cancelled => {
                    info!(pushed = report.pushed, "block poller stopping on shutdown");
                    return;
                }
                TickOutcome::ChannelClosed => {
                    warn!("block channel closed; block poller stopping");
                    return;
                }
                TickOutcome::CaughtUp
                | TickOutcome::HeadUnavailable(_)
                | TickOutcome::FetchFailed { .. } => {}
            }
        }
    }

    /// One polling round: refresh the head, then fetch and hand off every
    /// pending height in ascending order.
    pub async fn tick(&mut self) -> TickReport {
        let ctx = CallContext::new(self.shutdown.clone())
            .with_deadline(Instant::now() + self.config.tick_deadline);
        debug!(last_fetched = ?self.cursor.last_fetched, "block poller tick");

        let head = match self.reader.current_height(&ctx).await {
            Ok(head) => head,
            Err(_) if ctx.is_cancelled() => return TickReport::new(0, TickOutcome::Cancelled),
            Err(error) => {
                warn!(%error, "failed to refresh chain head; skipping tick");
                return TickReport::new(0, TickOutcome::HeadUnavailable(error));
            }
        };
        self.cursor.next_observed = head;

        let mut pushed = 0;
        for height in self.cursor.pending() {
            if ctx.is_cancelled() {
                return TickReport::new(pushed, TickOutcome::Cancelled);
            }

            let block = match self.reader.block_at(&ctx, height).await {
                Ok(block) => block,
                Err(_) if ctx.is_cancelled() => {
                    return TickReport::new(pushed, TickOutcome::Cancelled)
                }
                Err(error) => {
                    warn!(height, %error, "failed to fetch block; abandoning tick");
                    return TickReport::new(pushed, TickOutcome::FetchFailed { height, error });
                }
            };

            self.cursor.last_fetched = Some(height);
            debug!(
                height,
                transactions = block.transactions.len(),
                "handing block to aggregation"
            );

            // Waiting here when the channel is full is the backpressure path.
            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    return TickReport::new(pushed, TickOutcome::Cancelled);
                }
                sent = self.output.send(block) => {
                    if sent.is_err() {
                        return TickReport::new(pushed, TickOutcome::ChannelClosed);
                    }
                }
            }
            pushed += 1;
        }

        if pushed > 0 {
            info!(pushed, head, "block poller caught up");
        }
        TickReport::new(pushed, TickOutcome::CaughtUp)
    }
}

#[cfg(test)]
impl<R: ChainReader + ?Sized> BlockPoller<R> {
    fn positioned(
        reader: Arc<R>,
        output: mpsc::Sender<Block>,
        cursor: PollerCursor,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            reader,
            output,
            config: PollerConfig::default(),
            cursor,
            shutdown,
        }
    }
}
