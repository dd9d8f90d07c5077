//! vk-call
//!
//! Command-line host for the VK API client:
//! 1. Loads configuration and the access token
//! 2. Issues a plain, paginated or batched call
//! 3. Prints each response (or item) as one JSON line on stdout

mod auth;
mod cli;
mod config;
mod events;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vk_api::{ApiClient, Connection, ReqwestTransport};

use crate::auth::TokenFileAuthenticator;
use crate::cli::Args;
use crate::config::Config;
use crate::events::ConsoleEvents;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr keep stdout for results; LOG_LEVEL / RUST_LOG supported
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();

    let prometheus = if args.metrics {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let config = match Config::resolve_path(args.config.as_deref()) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => Config::from_env().context("failed to load configuration")?,
    };

    info!(
        base_url = %config.api.base_url,
        version = %config.api.version,
        token_file = ?config.auth.token_file,
        "configuration loaded"
    );

    let events = Arc::new(ConsoleEvents::new());
    let authenticator = Arc::new(TokenFileAuthenticator::new(config.auth.token_file.clone()));
    let mut connection = Connection::new(authenticator, events.clone());
    match config.auth.access_token {
        Some(token) => connection = connection.with_access_token(token),
        None => warn!("no access token configured, waiting for re-authentication"),
    }
    let connection = Arc::new(connection);

    let transport =
        ReqwestTransport::new(&config.http).context("failed to build HTTP transport")?;
    let client = ApiClient::new(connection.clone(), Arc::new(transport), config.api);

    let outcome = tokio::select! {
        result = run(&client, &args) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, closing connection");
            connection.close();
            Err(vk_api::Error::Closing)
        }
    };
    connection.close();
    if events.is_fatal() {
        warn!("session ended by a fatal server error");
    }

    if let Some(handle) = prometheus {
        render_metrics(&handle);
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(e) if e.is_silent() => {
            info!(error = %e, "call dropped without a result");
            Ok(())
        }
        Err(e) => {
            if let Some(value) = e.error_value() {
                print_line(value)?;
            }
            Err(anyhow::Error::new(e).context(format!("{} failed", args.method)))
        }
    }
}

/// Issue the call described by `args`, printing results as they arrive.
async fn run(client: &ApiClient, args: &Args) -> vk_api::Result<()> {
    let mut write_error = None;
    let mut emit = |value: serde_json::Value| {
        if write_error.is_none() {
            write_error = print_line(&value).err();
        }
    };

    let params = args.call_parameters();
    if let Some(ids) = &args.ids {
        client
            .call_batched(&args.method, &params, &ids.param, &ids.ids, &mut emit)
            .await?;
    } else if let Some(pagination) = args.pagination() {
        client
            .call_paginated(&args.method, &params, pagination, &mut emit)
            .await?;
    } else {
        let response = client.call(&args.method, &params).await?;
        emit(response);
    }

    if let Some(e) = write_error {
        warn!(error = %e, "failed to write output");
    }
    Ok(())
}

fn print_line(value: &serde_json::Value) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn render_metrics(handle: &PrometheusHandle) {
    eprint!("{}", handle.render());
}
