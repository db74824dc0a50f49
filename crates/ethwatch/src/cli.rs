use std::time::Duration;

use clap::{Parser, ValueEnum};

use ethwatch_core::StartPolicy;

/// ethwatch: follow an Ethereum-style node and index transactions for
/// subscribed addresses.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// JSON-RPC endpoint of the node (http or https).
    #[arg(
        long,
        default_value = "https://cloudflare-eth.com",
        env = "ETHWATCH_NODE_URL"
    )]
    pub node_url: String,

    /// Timeout for a single JSON-RPC request, in milliseconds.
    #[arg(long, default_value = "2000", env = "ETHWATCH_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Seconds between polling rounds.
    #[arg(long, default_value = "10", env = "ETHWATCH_POLL_INTERVAL_SECS")]
    pub poll_interval_secs: u64,

    /// Budget for all node requests within one polling round, in seconds.
    #[arg(long, default_value = "5", env = "ETHWATCH_TICK_DEADLINE_SECS")]
    pub tick_deadline_secs: u64,

    /// Blocks that may queue between the poller and the index.
    #[arg(long, default_value = "10", env = "ETHWATCH_BLOCK_BUFFER")]
    pub block_buffer: usize,

    /// Cap on outbound JSON-RPC requests per second (unlimited if omitted).
    #[arg(long, env = "ETHWATCH_RPC_REQUESTS_PER_SECOND")]
    pub rpc_requests_per_second: Option<u32>,

    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1", env = "ETHWATCH_BIND")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, default_value = "9000", env = "ETHWATCH_PORT")]
    pub port: u16,

    /// Browser origin allowed to call the API cross-origin, e.g.
    /// `http://localhost:3000`. No CORS headers are sent when omitted.
    #[arg(long, env = "ETHWATCH_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Which block is indexed first after startup.
    #[arg(
        long,
        value_enum,
        default_value_t = StartPolicyArg::ResumeAtHead,
        env = "ETHWATCH_START_POLICY"
    )]
    pub start_policy: StartPolicyArg,
}

impl Cli {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick_deadline(&self) -> Duration {
        Duration::from_secs(self.tick_deadline_secs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StartPolicyArg {
    /// Start with the block that is current at startup.
    ResumeAtHead,
    /// Start with the first block produced after startup.
    AfterHead,
}

impl From<StartPolicyArg> for StartPolicy {
    fn from(arg: StartPolicyArg) -> Self {
        match arg {
            StartPolicyArg::ResumeAtHead => StartPolicy::ResumeAtHead,
            StartPolicyArg::AfterHead => StartPolicy::AfterHead,
        }
    }
}
