//! Scan snapshots: a [`ScanReport`] saved as MessagePack so a map can be
//! re-rendered (with different map settings) without crawling again.

use std::path::Path;

use crate::{error::Result, peers::ScanReport};

pub fn encode(report: &ScanReport) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(report)?)
}

pub fn decode(bytes: &[u8]) -> Result<ScanReport> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub async fn save(report: &ScanReport, path: &Path) -> Result<()> {
    let bytes = encode(report)?;
    tokio::fs::write(path, bytes).await?;
    tracing::info!(path = %path.display(), nodes = report.len(), "snapshot saved");
    Ok(())
}

pub async fn load(path: &Path) -> Result<ScanReport> {
    let bytes = tokio::fs::read(path).await?;
    let report = decode(&bytes)?;
    tracing::info!(path = %path.display(), nodes = report.len(), "snapshot loaded");
    Ok(report)
}
