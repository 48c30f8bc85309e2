// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retouch — command-line raster editor.
//
// Entry point. Initialises logging, parses arguments and hands off to the
// edit pipeline in `cli`.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use cli::CliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Retouch starting");

    cli::run(CliArgs::parse()).await
}
