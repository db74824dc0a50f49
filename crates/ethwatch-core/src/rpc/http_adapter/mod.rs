//! JSON-RPC client for Ethereum-compatible node endpoints.
//!
//! Implements [`ChainReader`](super::ChainReader) over HTTP using `reqwest`,
//! with a per-request timeout and optional outbound rate limiting.

mod client;
mod connection;
mod parsing;
mod protocol;

pub use client::HttpChainReader;
