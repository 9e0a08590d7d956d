use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use netmap::{
    config::Config,
    crawler::Crawler,
    logging,
    map::MapDocument,
    output::{self, WrittenMap},
    peers::ScanReport,
    snapshot,
};
use tracing::info;

/// Draw a map of the peer-to-peer network as KML/KMZ.
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
struct Cli {
    /// Path to the configuration file.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(flatten)]
    render: RenderArgs,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Crawl the network and write the map. This is the default.
    Scan {
        /// Start from these nodes instead of the configured bootstrap peers.
        #[clap(long = "bootstrap")]
        bootstrap: Vec<String>,
        /// Also save the scan results here for a later `render`.
        #[clap(long)]
        snapshot: Option<PathBuf>,
    },
    /// Write the map from a saved snapshot without crawling.
    Render {
        snapshot: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct RenderArgs {
    /// Directory the map files are written to.
    #[clap(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Only write the `.kml` file.
    #[clap(long, global = true)]
    no_kmz: bool,
    /// Leave out nodes reporting an older version than this.
    #[clap(long, global = true)]
    min_version: Option<String>,
}

impl RenderArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.no_kmz {
            config.output.kmz = false;
        }
        if let Some(version) = &self.min_version {
            config.map.min_peer_version = Some(version.clone());
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init_terminal_logging()?;
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())
        .await
        .context("failed to load config")?;
    cli.render.apply(&mut config);

    let command = cli.command.unwrap_or(Commands::Scan {
        bootstrap: Vec::new(),
        snapshot: None,
    });
    let written = match command {
        Commands::Scan {
            bootstrap,
            snapshot: snapshot_path,
        } => {
            if !bootstrap.is_empty() {
                config.bootstrap_peers = bootstrap;
            }
            scan(&config, snapshot_path.as_deref()).await?
        }
        Commands::Render { snapshot: path } => {
            let report = snapshot::load(&path)
                .await
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            render(&config, &report).await?
        }
    };

    println!("KML written to {}", written.kml.display());
    if let Some(kmz) = written.kmz {
        println!("KMZ written to {}", kmz.display());
    }
    Ok(())
}

async fn scan(config: &Config, snapshot_path: Option<&Path>) -> Result<WrittenMap> {
    let crawler = Crawler::from_config(config)?;
    let bootstrap = crawler.bootstrap_addresses(&config.bootstrap_peers);
    if bootstrap.is_empty() {
        anyhow::bail!("no usable bootstrap peers");
    }

    let delay = config.scan_delay();
    if !delay.is_zero() {
        info!(seconds = delay.as_secs(), "waiting before scan");
        tokio::time::sleep(delay).await;
    }

    info!(bootstrap = bootstrap.len(), "start the scan");
    let report = crawler.crawl(bootstrap).await;

    if let Some(path) = snapshot_path {
        snapshot::save(&report, path)
            .await
            .with_context(|| format!("failed to save snapshot {}", path.display()))?;
    }
    render(config, &report).await
}

async fn render(config: &Config, report: &ScanReport) -> Result<WrittenMap> {
    let map = MapDocument::build(report, &config.map);
    let written = output::write_map(&map, &config.output)
        .await
        .context("failed to write map")?;
    info!("done");
    Ok(written)
}
