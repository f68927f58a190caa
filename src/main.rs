use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use visited_map::catalog::RegionCatalog;
use visited_map::config::AppConfig;
use visited_map::server::{self, AppState};
use visited_map::store::VisitedStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::load_from_file(&cli.config)?;

    println!("Loading region boundaries from {:?}...", config.input.geojson);
    let catalog = match RegionCatalog::load(&config.input.geojson, &config.input.name_property) {
        Ok(catalog) => {
            println!("Loaded {} regions", catalog.names().len());
            catalog
        }
        Err(e) => {
            // The server still starts; the map renders without regions.
            tracing::warn!("Could not load boundary data: {}", e);
            RegionCatalog::empty()
        }
    };

    let store = VisitedStore::new(config.store.path.clone());

    let state = Arc::new(AppState {
        config,
        catalog,
        store,
    });

    server::start_server(state).await?;

    Ok(())
}
