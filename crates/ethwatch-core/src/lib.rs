pub mod error;
pub mod poller;
pub mod rpc;
pub mod service;
pub mod shutdown;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{CoreError, RpcError};
pub use poller::{BlockPoller, PollerConfig, PollerCursor, StartPolicy, TickOutcome, TickReport};
pub use rpc::{CallContext, ChainReader, HttpChainReader};
pub use service::AggregationService;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use types::{Block, Transaction};
