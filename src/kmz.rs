//! KMZ packaging: a deflate-compressed zip holding the KML document.

use std::io::{Cursor, Write};

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::error::Result;

/// Packs `kml` into a KMZ archive whose only entry is `kml_name`.
pub fn pack(kml_name: &str, kml: &str) -> Result<Vec<u8>> {
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    archive.start_file(kml_name, options)?;
    archive.write_all(kml.as_bytes())?;
    let cursor = archive.finish()?;
    Ok(cursor.into_inner())
}
