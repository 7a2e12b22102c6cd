use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use navdash_cli::cli::Cli;
use navdash_cli::error::Result;
use navdash_cli::http::HttpClient;
use navdash_cli::{commands, config, logging};
use navdash_core::sync::Dashboard;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: logger not initialized: {}", e);
    }
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(config::default_config_path);
    let client_config = config::load_config(&path).with_overrides(cli.api, cli.token);
    log::debug!(target: "navdash.cli", "Using API at {}", client_config.api_base);

    let client = HttpClient::new(&client_config)?;
    let mut dashboard = Dashboard::new(Arc::new(client));
    commands::connect(&mut dashboard, &client_config.api_base).await?;

    let mut out = io::stdout().lock();
    commands::execute(&mut dashboard, cli.command, &mut out).await
}
