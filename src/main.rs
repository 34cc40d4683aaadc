//! certgrant - mTLS client certificates as the OAuth2 client secret

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use certgrant::{
    authserver::AuthServer,
    cli::{Cli, Command},
    client::ResourceClient,
    config::Config,
    fault::FaultReporter,
    resource::ResourceServer,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let reporter = FaultReporter::default();

    let result = match cli.command {
        Command::AuthServer => AuthServer::new(config, reporter).run().await,
        Command::ResourceServer => ResourceServer::new(config, reporter).run().await,
        Command::Client => match ResourceClient::new(config.client) {
            Ok(mut client) => client.run().await.map(|report| {
                info!(calls = report.calls_made, "Client finished");
            }),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
