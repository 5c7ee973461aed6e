// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Divide & Draw backend
//
// Entry point. Initialises logging, loads configuration, and serves HTTP
// until Ctrl-C.
//
// Usage: `divdraw [config.json]`.  Without an argument the path is taken from
// `DIVDRAW_CONFIG`; without either, built-in defaults and environment
// overrides apply.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use divdraw_core::config::AppConfig;
use divdraw_core::error::Result;
use divdraw_server::SketchServer;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Divide & Draw backend starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Divide & Draw backend failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = config_path(
        std::env::args_os().nth(1),
        std::env::var_os("DIVDRAW_CONFIG"),
    );
    let config = AppConfig::load(path.as_deref())?;
    tracing::debug!(?config, "configuration resolved");

    let mut server = SketchServer::new(&config)?;
    server.start().await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C; shutting down");
    } else {
        tracing::info!("Ctrl-C received");
    }

    server.stop().await
}

/// The CLI argument wins over `DIVDRAW_CONFIG`; empty values are ignored.
fn config_path(arg: Option<OsString>, env: Option<OsString>) -> Option<PathBuf> {
    arg.into_iter()
        .chain(env)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}
