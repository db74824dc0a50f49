mod cli;
mod server;

use std::sync::Arc;

use axum::http::HeaderValue;
use clap::Parser;
use eyre::{ensure, eyre, WrapErr};
use tokio::sync::mpsc;

use ethwatch_core::{
    AggregationService, BlockPoller, ChainReader, HttpChainReader, PollerConfig, Shutdown,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    ensure!(args.block_buffer > 0, "--block-buffer must be at least 1");

    let shutdown = Arc::new(Shutdown::new());
    let signals = tokio::spawn(listen_for_signals(Arc::clone(&shutdown)));

    let reader: Arc<dyn ChainReader> = Arc::new(
        HttpChainReader::new(
            &args.node_url,
            args.request_timeout(),
            args.rpc_requests_per_second,
        )
        .context("configure chain reader")?,
    );

    // The poller needs the node's head before anything else can start.
    let (blocks_tx, blocks_rx) = mpsc::channel(args.block_buffer);
    let config = PollerConfig {
        poll_interval: args.poll_interval(),
        tick_deadline: args.tick_deadline(),
        start_policy: args.start_policy.into(),
    };
    let poller = BlockPoller::start(reader, blocks_tx, config, shutdown.signal())
        .await
        .map_err(|err| {
            let message = format_node_connect_error(&args.node_url, &err.to_string());
            eyre!(message).wrap_err("while determining the initial chain head")
        })?;
    tracing::info!(node = %args.node_url, cursor = ?poller.cursor(), "connected to node");

    let service = Arc::new(AggregationService::new());
    let aggregation = {
        let service = Arc::clone(&service);
        let signal = shutdown.signal();
        tokio::spawn(async move { service.run(blocks_rx, signal).await })
    };
    let polling = tokio::spawn(poller.run());

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let cors_origin = args
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .context("parse --cors-origin")?;
    if let Some(origin) = &cors_origin {
        tracing::info!(?origin, "allowing cross-origin API access");
    }
    let router = server::build_router(server::AppState { service }, cors_origin);

    if args.bind == "0.0.0.0" {
        tracing::warn!("server is bound to 0.0.0.0; it is accessible from the network");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("bind TCP listener")?;

    tracing::info!("listening on {bind_addr}");
    let mut server_signal = shutdown.signal();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_signal.triggered().await })
        .await
        .context("run HTTP server");

    // Whatever ended the server also ends the pipeline.
    shutdown.trigger();
    signals.abort();
    polling.await.context("join block poller")?;
    aggregation.await.context("join aggregation service")?;
    tracing::info!("shutdown complete");

    served
}

/// Trigger `shutdown` on SIGINT or SIGTERM.
async fn listen_for_signals(shutdown: Arc<Shutdown>) {
    match wait_for_signal().await {
        Ok(name) => {
            tracing::info!(signal = name, "received shutdown signal");
            shutdown.trigger();
        }
        Err(err) => tracing::error!(%err, "failed to install signal handlers"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

fn format_node_connect_error(node_url: &str, source_error: &str) -> String {
    let mut lines = vec![
        format!("could not reach node endpoint `{node_url}`"),
        format!("node error: {source_error}"),
    ];

    if source_error.contains("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the endpoint hostname and your DNS/network"
                .into(),
        );
    } else if source_error.contains("timed out") {
        lines.push(
            "hint: the node did not answer in time; raise --request-timeout-ms or check the endpoint"
                .into(),
        );
    } else if source_error.contains("JSON-RPC server error") {
        lines.push("hint: the node rejected eth_blockNumber; verify the endpoint serves the Ethereum JSON-RPC API".into());
    } else if source_error.contains("HTTP transport error") {
        lines.push(
            "hint: request could not be sent; verify URL, network access, and endpoint reachability"
                .into(),
        );
    }

    lines.join("\n")
}
