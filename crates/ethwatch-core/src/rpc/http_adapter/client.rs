use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header;
use tracing::{debug, trace, warn};

use crate::error::{CoreError, RpcError};
use crate::types::Block;

use super::super::{CallContext, ChainReader};
use super::connection::parse_connection;
use super::parsing::{format_hex_quantity, parse_block_result, parse_height_result};
use super::protocol::{parse_jsonrpc_error, JsonRpcRequest, JsonRpcResponse};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Ethereum JSON-RPC client over HTTP(S).
///
/// Every call is bounded by `request_timeout` and by the caller's
/// [`CallContext`]; nothing is retried here.
pub struct HttpChainReader {
    client: reqwest::Client,
    url: String,
    request_timeout: Duration,
    limiter: Option<DirectRateLimiter>,
    next_id: AtomicU64,
}

impl HttpChainReader {
    /// Create a reader for an `http://` or `https://` node endpoint.
    ///
    /// If `requests_per_second` is set, outbound requests are rate-limited;
    /// time spent waiting for the limiter counts against the request budget.
    pub fn new(
        connection: &str,
        request_timeout: Duration,
        requests_per_second: Option<u32>,
    ) -> Result<Self, CoreError> {
        if request_timeout.is_zero() {
            return Err(CoreError::InvalidConfig(
                "request timeout must be non-zero".to_owned(),
            ));
        }
        let url = parse_connection(connection)?;

        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("build HTTP client: {e}")))?;

        let limiter = match requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::InvalidConfig("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            url,
            request_timeout,
            limiter,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn rpc_call(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, CoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            rpc.id = id,
            rpc.method = method,
            rpc.params = params.len(),
            "rpc call"
        );
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let exchange = async {
            self.wait_for_rate_limit().await;
            let response = self
                .client
                .post(&self.url)
                .header(header::CONTENT_TYPE, "application/json")
                .json(&req)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, RpcError>((status, body))
        };
        let (status, body) = ctx.run(self.request_timeout, exchange).await?;
        debug!(rpc.id = id, rpc.method = method, %status, body_len = body.len(), "rpc response");
        trace!(rpc.id = id, rpc.method = method, body = %body, "rpc response body");

        let decoded: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            RpcError::InvalidResponse(format!(
                "decode JSON-RPC response (HTTP {status}): {e}; body={body}"
            ))
        })?;

        if let Some(err) = decoded.error {
            return Err(parse_jsonrpc_error(err).into());
        }

        Ok(decoded.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn current_height(&self, ctx: &CallContext) -> Result<u64, CoreError> {
        let raw = self.rpc_call(ctx, "eth_blockNumber", Vec::new()).await?;
        parse_height_result(&raw)
    }

    async fn block_at(&self, ctx: &CallContext, height: u64) -> Result<Block, CoreError> {
        let raw = self
            .rpc_call(
                ctx,
                "eth_getBlockByNumber",
                vec![
                    serde_json::json!(format_hex_quantity(height)),
                    serde_json::json!(true),
                ],
            )
            .await?;

        let block = parse_block_result(raw, height)?;
        if block.height != height {
            warn!(
                requested = height,
                reported = block.height,
                "node returned a block with a different height than requested"
            );
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_rate_limit() {
        let err = HttpChainReader::new("http://127.0.0.1:8545", Duration::from_secs(2), Some(0))
            .err()
            .expect("zero rate must be rejected");
        assert!(err.to_string().contains("requests_per_second"));
    }

    #[test]
    fn new_rejects_zero_timeout() {
        let err = HttpChainReader::new("http://127.0.0.1:8545", Duration::ZERO, None)
            .err()
            .expect("zero timeout must be rejected");
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn new_rejects_non_http_scheme() {
        let result = HttpChainReader::new("ws://127.0.0.1:8546", Duration::from_secs(2), None);
        assert!(result.is_err());
    }

    #[test]
    fn new_keeps_request_timeout() {
        let reader = HttpChainReader::new("http://127.0.0.1:8545", Duration::from_millis(750), None)
            .expect("valid config");
        assert_eq!(reader.request_timeout(), Duration::from_millis(750));
    }
}
