// ===== enum error::Error =====================================================
///
/// Everything that can go wrong inside the mapper. Failures that concern a
/// single node (unreachable peer, failed geo lookup) are absorbed by the
/// crawler and never surface here; what is left is fatal to a run.
///
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid node address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build http client")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not resolve {host}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no address records for {0}")]
    NoAddress(String),

    #[error("geo lookup for {ip} failed: {message}")]
    GeoLookup { ip: String, message: String },

    #[error("invalid config file")]
    Config(#[from] toml::de::Error),

    #[error("failed to encode snapshot")]
    SnapshotEncode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode snapshot")]
    SnapshotDecode(#[from] rmp_serde::decode::Error),

    #[error("failed to build kmz archive")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
