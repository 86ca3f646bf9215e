pub mod classify;
pub mod config;
pub mod data;
pub mod join;
pub mod projection;
pub mod render;
pub mod server;
pub mod topology;
pub mod types;
pub mod view;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch geometry and statistics and render the choropleth map
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Overrides `output.path`
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the rendered map and the county lookup API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config, output } => {
            info!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // 1. Load both documents; either failing aborts the render.
            let data = data::load_data(&app_config).await?;

            // 2. Join, classify, build the view model
            let view = view::build_view(&app_config, &data.regions, &data.records);

            // 3. Write the page
            let path = output.clone().unwrap_or_else(|| app_config.output.path.clone());
            render::write_output(&app_config, &view, &path)?;

            info!("Render complete!");
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // The lookup API answers from the same joined data the page shows.
            let data = data::load_data(&app_config).await?;

            server::start_server(app_config, data).await?;
        }
    }

    Ok(())
}
