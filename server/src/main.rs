use std::path::PathBuf;

use clap::Parser;
use config::{load_env_file, PathManager, Settings};
use picstash_core::FsImageStore;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "picstash-server", about = "Image store server for the picstash gallery")]
struct Args {
    /// Host to bind
    #[arg(long, env = "PICSTASH_HOST")]
    host: Option<String>,

    /// Port to bind (0 picks a free port)
    #[arg(long, env = "PICSTASH_PORT")]
    port: Option<u16>,

    /// Directory holding the stored images
    #[arg(long, env = "PICSTASH_DIR")]
    dir: Option<PathBuf>,

    /// Public URL prefix stored images are served under
    #[arg(long, env = "PICSTASH_PUBLIC_BASE")]
    public_base: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env files
    load_env_file();
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::load();
    let host = args.host.unwrap_or_else(|| settings.host.clone());
    let port = args.port.unwrap_or(settings.port);
    let public_base = args
        .public_base
        .unwrap_or_else(|| settings.public_base.clone());

    let dir = args
        .dir
        .or_else(|| settings.store_dir.as_ref().map(PathBuf::from))
        .or_else(PathManager::images_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine the image directory"))?;

    let store = FsImageStore::new(dir.clone(), public_base);
    let handle = server::start_server_on(&host, port, store).await?;
    tracing::info!("Serving images from {} at {}", dir.display(), handle.url());

    tokio::signal::ctrl_c().await?;
    handle.stop();

    Ok(())
}
