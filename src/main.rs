use clap::Parser;
use harbormaster::api::ApiServer;
use harbormaster::cli::{Cli, Commands, ConfigAction};
use harbormaster::config::{validate_config_object, ServerConfig};
use harbormaster::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(opts) => {
            info!("Starting Harbormaster API server");
            let mut config = ServerConfig::load(opts.config.as_deref())?;
            if let Some(port) = opts.port {
                config.http.port = port;
            }
            if let Some(bind) = opts.bind {
                config.http.bind = bind;
            }
            validate_config_object(&config)?;
            let server = ApiServer::start(config).await?;
            server.run_until_shutdown().await?;
        }
        Commands::Config(opts) => {
            match opts.action {
                ConfigAction::Show => {
                    let config = ServerConfig::load(opts.config.as_deref())?;
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                ConfigAction::Validate => {
                    let config = ServerConfig::load(opts.config.as_deref())?;
                    validate_config_object(&config)?;
                    info!("Configuration is valid");
                }
                ConfigAction::Init => {
                    ServerConfig::write_default(
                        opts.config.as_deref().unwrap_or("harbormaster.json"),
                    )?;
                    info!("Configuration file created");
                }
            }
        }
        Commands::Version => {
            println!("harbormaster {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
