//! Configuration for the network mapper.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    peers::DEFAULT_P2P_PORT,
};

const ENV_CONFIG_DIR: &str = "NETMAP_CONFIG_DIR";

/// Name of the optional config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "netmap.config.toml";

/// Name of directory that wraps netmap files in the platform config directory.
const NETMAP_DIR: &str = "netmap";

/// The configuration for a scan and the map it produces.
#[derive(PartialEq, Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Nodes the crawl starts from.
    pub bootstrap_peers: Vec<String>,
    /// Port assumed for addresses that don't name one.
    pub default_port: u16,
    /// BRS version announced in the `User-Agent` header.
    pub p2p_version: String,
    /// Seconds each HTTP request may take.
    pub request_timeout_secs: u64,
    /// How many nodes are probed at once.
    pub concurrency: usize,
    /// Stop discovering new addresses once this many are known.
    pub max_nodes: Option<usize>,
    /// Seconds to wait before the crawl starts.
    pub scan_delay_secs: u64,
    /// Base URL of the IP geolocation API; the IP is appended.
    pub geo_api_url: String,
    pub map: MapConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootstrap_peers: vec![
                "us-east.signum.network".to_owned(),
                "europe.signum.network".to_owned(),
                "europe1.signum.network".to_owned(),
            ],
            default_port: DEFAULT_P2P_PORT,
            p2p_version: "3.8.4".to_owned(),
            request_timeout_secs: 10,
            concurrency: 20,
            max_nodes: None,
            scan_delay_secs: 0,
            geo_api_url: "https://ipwho.is/".to_owned(),
            map: MapConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Creates a config from a config file.
    ///
    /// If *file* is `Some` the configuration is read from it. Otherwise the
    /// default config file is loaded, and if that is not present either the
    /// default config is used.
    pub async fn load(file: Option<&Path>) -> Result<Config> {
        let default_config = config_root().map(|root| root.join(CONFIG_FILE_NAME));

        let config_file = match file {
            Some(file) => Some(file.to_path_buf()),
            None => default_config.filter(|path| path.exists()),
        };
        match config_file {
            Some(file) => {
                tracing::debug!(path = %file.display(), "loading config");
                let config = tokio::fs::read_to_string(&file).await?;
                Self::load_toml(&config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load_toml(s: &str) -> Result<Config> {
        let config = toml::from_str(s).map_err(Error::Config)?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scan_delay(&self) -> Duration {
        Duration::from_secs(self.scan_delay_secs)
    }

    pub fn user_agent(&self) -> String {
        format!("BRS/{}", self.p2p_version)
    }
}

/// How the map is drawn.
#[derive(PartialEq, Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MapConfig {
    /// Name of the KML document.
    pub name: String,
    /// Icon used for node placemarks.
    pub pin_icon_url: String,
    /// Width of link lines.
    pub line_width: u32,
    /// Altitude in meters of the per-node details bubble.
    pub details_altitude: f64,
    /// Leave out nodes reporting an older version than this.
    pub min_peer_version: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            name: "P2P Network Map".to_owned(),
            pin_icon_url: "https://signum.network/assets/img/wallet/Signum_Logomark_blue_filled.svg"
                .to_owned(),
            line_width: 2,
            details_altitude: 10_000.0,
            min_peer_version: None,
        }
    }
}

/// Where the map ends up.
#[derive(PartialEq, Eq, Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// File name without extension, shared by the `.kml` and `.kmz` outputs.
    pub file_stem: String,
    /// Also write a zipped `.kmz` next to the `.kml`.
    pub kmz: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            file_stem: "network".to_owned(),
            kmz: true,
        }
    }
}

impl OutputConfig {
    pub fn kml_file_name(&self) -> String {
        format!("{}.kml", self.file_stem)
    }

    pub fn kmz_file_name(&self) -> String {
        format!("{}.kmz", self.file_stem)
    }
}

/// Returns the netmap config directory.
///
/// If the `NETMAP_CONFIG_DIR` environment variable is set it is used
/// unconditionally, otherwise `netmap` inside the platform config directory
/// (`$XDG_CONFIG_HOME` or `$HOME/.config` on Linux). `None` when the platform
/// provides no config directory.
pub fn config_root() -> Option<PathBuf> {
    if let Some(val) = env::var_os(ENV_CONFIG_DIR) {
        return Some(PathBuf::from(val));
    }
    dirs_next::config_dir().map(|dir| dir.join(NETMAP_DIR))
}
