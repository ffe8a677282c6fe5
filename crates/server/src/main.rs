// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0
use clap::Parser;
use log::error;
use tablestakes_server::Config;

#[derive(Debug, Parser)]
struct Cli {
    /// The server listening address.
    #[clap(long, short, default_value = "127.0.0.1")]
    address: String,
    /// The server listening port.
    #[clap(long, short, default_value_t = 9871)]
    port: u16,
    /// The privileged mode shared secret, unset disables the test hooks.
    #[clap(long, env = "TABLESTAKES_SECRET")]
    secret: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = Config {
        address: cli.address,
        port: cli.port,
        secret: cli.secret,
    };

    if let Err(e) = tablestakes_server::run(config).await {
        error!("{e}");
    }
}
