use clap::Parser;
use gallery_maker::commerce::CommerceApi;
use gallery_maker::commerce::stripe::StripeClient;
use gallery_maker::config::load_config;
use gallery_maker::pipeline::Pipeline;
use gallery_maker::storage::{BlobStore, SasBlobStore};
use std::path::PathBuf;

/// Turn folders of edited JPEGs into publishable album manifests.
#[derive(Parser)]
#[command(name = "gallery-maker", version)]
struct Cli {
    /// Folder of JPEGs, or a folder of album folders
    input: PathBuf,

    /// Output folder for renditions and the manifest
    output: PathBuf,

    /// Public base URL the album will be served from
    base_url: String,

    /// Configuration file
    #[arg(long, default_value = "gallery.toml")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    config.validate()?;

    let store = if config.storage.enabled {
        Some(SasBlobStore::from_connection_string(
            &config.secrets.storage_connection,
        )?)
    } else {
        None
    };
    let api = if config.commerce.enabled {
        Some(StripeClient::new(&config.secrets.commerce_api_key)?)
    } else {
        None
    };

    let mut pipeline = Pipeline::new(
        &config,
        api.as_ref().map(|a| a as &dyn CommerceApi),
        store.as_ref().map(|s| s as &dyn BlobStore),
    )?;
    pipeline.run(&cli.input, &cli.output, &cli.base_url)?;
    Ok(())
}
