use anyhow::Result;
use clap::{Parser, Subcommand};
use ecommerce_api::{config::Config, server, surface::manifest::Manifest, telemetry};
use tracing::info;

/// ECommerce API: access-controlled edge for products and orders
#[derive(Parser, Debug)]
#[command(name = "ecommerce-api", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the synthesized deployment manifest as JSON.
    Synth {
        #[arg(long)]
        pretty: bool,
    },
    /// Print the route table.
    Routes,
    /// Run the edge locally with echo handlers.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let prometheus = telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Synth { pretty } => {
            let manifest = Manifest::synthesize(&config)?;
            println!("{}", manifest.to_json(pretty)?);
        }
        Command::Routes => {
            let manifest = Manifest::synthesize(&config)?;
            for route in &manifest.routes {
                println!("{}", route);
            }
        }
        Command::Serve => {
            info!("Starting ECommerce edge");
            info!("HTTP server listening on {}", config.http_addr());
            server::run(config, prometheus).await?;
        }
    }

    Ok(())
}
