use std::path::PathBuf;

use tracing::info;

use crate::{config::OutputConfig, error::Result, kml, kmz, map::MapDocument};

/// Paths of the files a map was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenMap {
    pub kml: PathBuf,
    pub kmz: Option<PathBuf>,
}

/// Writes `map` as KML, and as KMZ too when configured.
pub async fn write_map(map: &MapDocument, config: &OutputConfig) -> Result<WrittenMap> {
    tokio::fs::create_dir_all(&config.dir).await?;

    let kml_name = config.kml_file_name();
    let document = kml::render(map);
    let kml_path = config.dir.join(&kml_name);
    tokio::fs::write(&kml_path, &document).await?;
    info!(
        path = %kml_path.display(),
        placemarks = map.placemarks.len(),
        links = map.links.len(),
        "kml written"
    );

    let kmz_path = if config.kmz {
        let archive = kmz::pack(&kml_name, &document)?;
        let path = config.dir.join(config.kmz_file_name());
        tokio::fs::write(&path, archive).await?;
        info!(path = %path.display(), "kmz written");
        Some(path)
    } else {
        None
    };

    Ok(WrittenMap {
        kml: kml_path,
        kmz: kmz_path,
    })
}
