// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mudd`: the driver binary. Reads [`mud_daemon::env::Config`] from the
//! environment, brings up logging, and runs the [`Orchestrator`] until
//! interrupted (§4.9, §6 "CLI/env").

use mud_daemon::compiler::DeclarativeCompiler;
use mud_daemon::env::Config;
use mud_daemon::orchestrator::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_pretty {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return std::process::ExitCode::from(err.exit_code() as u8);
        }
    };
    init_logging(&config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.tcp_port));
    let orchestrator = Orchestrator::new(&config, Arc::new(DeclarativeCompiler));

    match orchestrator.run(addr).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "driver exited with an error");
            std::process::ExitCode::from(err.exit_code() as u8)
        }
    }
}
