// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spoolview: print job state aggregator
//
// Entry point. Initialises logging, loads the configuration, and replays a
// recorded backend event log through the job service.
//
// Usage: spoolview <events.jsonl> [config.json]

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use spoolview_core::config::ModelConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Spoolview starting");

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(events) = args.next() else {
        eprintln!("usage: spoolview <events.jsonl> [config.json]");
        return ExitCode::from(2);
    };

    let config = match args.next() {
        Some(path) => match ModelConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => services::data_dir::load_config(&services::data_dir::config_dir()),
    };

    match services::replay::run(&events, config).await {
        Ok(summary) => {
            tracing::info!(
                events = summary.events,
                jobs = summary.jobs,
                refresh_requests = summary.refresh_requests,
                "replay finished"
            );
            for (view, rows) in &summary.views {
                println!("{view}: {rows}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "replay failed");
            ExitCode::FAILURE
        }
    }
}
