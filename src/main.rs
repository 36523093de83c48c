use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use food_analyzer::app::App;
use food_analyzer::models::{AnalyzeInput, Config};
use food_analyzer::server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "food-analyzer")]
#[command(about = "Estimate calories and macros from food photos")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address; overrides BIND_ADDR.
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Analyze one image and print the result as JSON.
    Analyze {
        /// Local image file or http(s) URL.
        #[arg(value_name = "FILE|URL")]
        image: String,
        /// Region hint, e.g. "us" or "jp".
        #[arg(long)]
        region: Option<String>,
    },
}

fn input_from_arg(image: &str, region: Option<String>) -> Result<AnalyzeInput> {
    let input = if image.starts_with("http://") || image.starts_with("https://") {
        AnalyzeInput::from_url(image)
    } else {
        let path = PathBuf::from(image);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        AnalyzeInput::from_bytes(&bytes)
    };
    Ok(input.with_region(region))
}

async fn run(args: CliArgs) -> Result<()> {
    let config = Config::from_env()?;
    let app = App::new(&config).context("Failed to initialize analyzer")?;

    match args.command {
        Command::Serve { bind } => {
            let bind_addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            info!("Backends: {:?}", app.backends());
            server::serve(Arc::new(app), &bind_addr).await?;
        }
        Command::Analyze { image, region } => {
            let input = input_from_arg(&image, region)?;
            let output = app.analyze(&input).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "food_analyzer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
