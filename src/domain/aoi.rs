//! Area-of-interest configuration.
//!
//! AOIs are small JSON files exported alongside the raster pipeline, e.g.
//! `{"name": "marajo", "bbox": [-50.02, -1.37, -49.12, -0.47]}`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::BoundingBox;

/// One AOI config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aoi {
    /// Display prefix, e.g. "marajo"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// AOI extent as [min_lon, min_lat, max_lon, max_lat]
    pub bbox: BoundingBox,
}

impl Aoi {
    /// Load an AOI from a JSON config file.
    ///
    /// A missing file is fatal: the AOI defines every downstream search
    /// and filter extent, so there is no sensible default.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Missing AOI config {}. Export one with a \"bbox\" [min_lon, min_lat, max_lon, max_lat] array first",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read AOI config: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse AOI config: {}", path.display()))
    }
}
