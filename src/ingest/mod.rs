//! Granule search and download.
//!
//! The search service is modeled as a collaborator trait so the retry
//! ladder can be tested without the network:
//!
//! 1. **Search**: provider auto-routing, then a named data center, then
//!    the named data center with a padded AOI
//! 2. **Download**: best-effort per granule, failures skip the file
//! 3. **Samples**: suffix-matched dataset extraction behind a reader trait
//!
//! An empty search result is not an error; callers skip the evidence-log
//! step when nothing is found.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geo::BoundingBox;

pub mod samples;

// Re-export key types
pub use samples::{
    extract_samples, pick_dataset, samples_to_geojson, write_samples_csv, write_samples_geojson,
    DatasetReader, PointSample,
};

/// Degrees of AOI padding applied on the final search retry
pub const SEARCH_PAD_DEG: f64 = 0.5;

/// Hosted CMR granule search endpoint
pub const CMR_GRANULE_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.json";

/// Errors surfaced by a granule search backend
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request never produced a usable response
    #[error("search request failed: {0}")]
    Request(String),

    /// The backend answered with something unexpected
    #[error("unexpected search response: {0}")]
    Response(String),
}

/// One downloadable granule returned by a search
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleHandle {
    /// Producer granule name, e.g. "GEDI04_C_2020..._V2.h5"
    pub name: String,

    /// Direct download URL when the backend provides one
    pub url: Option<String>,
}

/// Search parameters for one collection
#[derive(Debug, Clone)]
pub struct GranuleQuery {
    /// Collection short name, e.g. "GEDI04_C"
    pub short_name: String,

    /// Collection version
    pub version: String,

    /// ISO date range, inclusive
    pub start: String,
    pub end: String,

    /// Closed (lon, lat) polygon ring constraining the search
    pub polygon: Vec<(f64, f64)>,
}

impl GranuleQuery {
    /// Build a query over an AOI bounding box
    pub fn new(
        short_name: impl Into<String>,
        version: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        bbox: &BoundingBox,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            version: version.into(),
            start: start.into(),
            end: end.into(),
            polygon: bbox.ring(),
        }
    }
}

/// Granule search collaborator
#[async_trait]
pub trait GranuleSearch: Send + Sync {
    /// Search one data center (None = provider auto-routing)
    async fn search(
        &self,
        query: &GranuleQuery,
        data_center: Option<&str>,
    ) -> Result<Vec<GranuleHandle>, SearchError>;
}

/// Search with the retry ladder.
///
/// Tries provider auto-routing, then the named data center, then the
/// named data center with the AOI padded by `SEARCH_PAD_DEG`. Each
/// attempt's error is logged and swallowed; exhausting the ladder yields
/// an empty result, never an error.
pub async fn search_with_fallback<C: GranuleSearch + ?Sized>(
    client: &C,
    bbox: &BoundingBox,
    short_name: &str,
    version: &str,
    start: &str,
    end: &str,
    data_center: &str,
) -> Vec<GranuleHandle> {
    let query = GranuleQuery::new(short_name, version, start, end, bbox);

    for dc in [None, Some(data_center)] {
        match client.search(&query, dc).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => warn!("search error (data center {:?}): {}", dc, e),
        }
    }

    // Pad the AOI and try the named data center once more
    let padded = GranuleQuery::new(
        short_name,
        version,
        start,
        end,
        &bbox.pad(SEARCH_PAD_DEG),
    );
    match client.search(&padded, Some(data_center)).await {
        Ok(found) => {
            if !found.is_empty() {
                info!("found granules after padding the AOI by {} degrees", SEARCH_PAD_DEG);
            }
            found
        }
        Err(e) => {
            warn!("search error (padded AOI): {}", e);
            Vec::new()
        }
    }
}

/// CMR granule search client.
///
/// The hosted CMR JSON endpoint sits behind most granule search wrappers;
/// talking to it directly keeps the dependency surface small.
pub struct CmrClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for CmrClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CmrClient {
    /// Client against the hosted CMR endpoint
    pub fn new() -> Self {
        Self::with_base_url(CMR_GRANULE_URL)
    }

    /// Client against a custom endpoint (tests, mirrors)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CmrResponse {
    feed: CmrFeed,
}

#[derive(Debug, Deserialize)]
struct CmrFeed {
    #[serde(default)]
    entry: Vec<CmrEntry>,
}

#[derive(Debug, Deserialize)]
struct CmrEntry {
    #[serde(default)]
    producer_granule_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    links: Vec<CmrLink>,
}

#[derive(Debug, Deserialize)]
struct CmrLink {
    #[serde(default)]
    rel: String,
    #[serde(default)]
    href: String,
}

impl CmrEntry {
    fn into_handle(self) -> GranuleHandle {
        // "…/data#" marks the direct download link in CMR link relations
        let url = self
            .links
            .iter()
            .find(|l| l.rel.ends_with("/data#"))
            .map(|l| l.href.clone());
        GranuleHandle {
            name: self.producer_granule_id.unwrap_or(self.title),
            url,
        }
    }
}

#[async_trait]
impl GranuleSearch for CmrClient {
    async fn search(
        &self,
        query: &GranuleQuery,
        data_center: Option<&str>,
    ) -> Result<Vec<GranuleHandle>, SearchError> {
        let polygon = query
            .polygon
            .iter()
            .map(|(lon, lat)| format!("{},{}", lon, lat))
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![
            ("short_name", query.short_name.clone()),
            ("version", query.version.clone()),
            (
                "temporal",
                format!("{}T00:00:00Z,{}T23:59:59Z", query.start, query.end),
            ),
            ("polygon", polygon),
            ("page_size", "50".to_string()),
        ];
        if let Some(dc) = data_center {
            params.push(("data_center", dc.to_string()));
        }

        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Response(format!("status {}", response.status())));
        }

        let body: CmrResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Response(e.to_string()))?;

        Ok(body.feed.entry.into_iter().map(CmrEntry::into_handle).collect())
    }
}

/// Download up to `max` granules into `outdir`, returning written paths.
///
/// Handles without a URL and failed fetches are skipped with a warning;
/// the remaining handles continue (per-file failures never abort the
/// batch).
pub async fn download_granules(
    handles: &[GranuleHandle],
    outdir: &Path,
    max: usize,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(outdir)
        .await
        .with_context(|| format!("Failed to create download directory: {}", outdir.display()))?;

    let http = reqwest::Client::new();
    let mut paths = Vec::new();

    for handle in handles.iter().take(max) {
        let Some(url) = &handle.url else {
            warn!("no download URL for {}, skipping", handle.name);
            continue;
        };
        match fetch_granule(&http, url, outdir, &handle.name).await {
            Ok(path) => {
                info!("downloaded {}", path.display());
                paths.push(path);
            }
            Err(e) => warn!("download failed for {}: {:#}", handle.name, e),
        }
    }

    Ok(paths)
}

async fn fetch_granule(
    http: &reqwest::Client,
    url: &str,
    outdir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", url))?;

    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body of {}", url))?;

    let path = outdir.join(name);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted search backend recording every attempt
    struct ScriptedSearch {
        // (data_center, first polygon lon) per attempt
        attempts: Mutex<Vec<(Option<String>, f64)>>,
        script: Mutex<Vec<Result<Vec<GranuleHandle>, SearchError>>>,
    }

    impl ScriptedSearch {
        fn new(script: Vec<Result<Vec<GranuleHandle>, SearchError>>) -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
                script: Mutex::new(script),
            }
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GranuleSearch for ScriptedSearch {
        async fn search(
            &self,
            query: &GranuleQuery,
            data_center: Option<&str>,
        ) -> Result<Vec<GranuleHandle>, SearchError> {
            self.attempts
                .lock()
                .unwrap()
                .push((data_center.map(String::from), query.polygon[0].0));
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(Vec::new())
            } else {
                script.remove(0)
            }
        }
    }

    fn handle(name: &str) -> GranuleHandle {
        GranuleHandle {
            name: name.to_string(),
            url: None,
        }
    }

    fn aoi() -> BoundingBox {
        BoundingBox::new(-50.0, -1.5, -49.0, -0.5).unwrap()
    }

    #[tokio::test]
    async fn test_fallback_recovers_from_first_error() {
        let client = ScriptedSearch::new(vec![
            Err(SearchError::Request("timeout".to_string())),
            Ok(vec![handle("g1")]),
        ]);

        let found = search_with_fallback(
            &client, &aoi(), "GEDI04_C", "2", "2019-04-01", "2025-12-31", "ORNL_DAAC",
        )
        .await;

        assert_eq!(found, vec![handle("g1")]);
        assert_eq!(client.attempt_count(), 2);
    }

    #[tokio::test]
    async fn test_fallback_pads_aoi_on_final_attempt() {
        let client = ScriptedSearch::new(vec![
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(vec![handle("g-padded")]),
        ]);

        let found = search_with_fallback(
            &client, &aoi(), "GEDI04_C", "2", "2019-04-01", "2025-12-31", "ORNL_DAAC",
        )
        .await;

        assert_eq!(found, vec![handle("g-padded")]);

        let attempts = client.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].0, None);
        assert_eq!(attempts[1].0, Some("ORNL_DAAC".to_string()));
        assert_eq!(attempts[2].0, Some("ORNL_DAAC".to_string()));
        // Final attempt used the padded ring
        assert_eq!(attempts[1].1, -50.0);
        assert_eq!(attempts[2].1, -50.0 - SEARCH_PAD_DEG);
    }

    #[tokio::test]
    async fn test_fallback_exhaustion_is_empty_not_error() {
        let client = ScriptedSearch::new(vec![
            Err(SearchError::Request("down".to_string())),
            Err(SearchError::Request("down".to_string())),
            Err(SearchError::Request("down".to_string())),
        ]);

        let found = search_with_fallback(
            &client, &aoi(), "GEDI04_C", "2", "2019-04-01", "2025-12-31", "ORNL_DAAC",
        )
        .await;

        assert!(found.is_empty());
        assert_eq!(client.attempt_count(), 3);
    }

    #[test]
    fn test_cmr_entry_picks_data_link() {
        let entry = CmrEntry {
            producer_granule_id: Some("GEDI04_C_TEST.h5".to_string()),
            title: "ignored".to_string(),
            links: vec![
                CmrLink {
                    rel: "http://esipfed.org/ns/fedsearch/1.1/metadata#".to_string(),
                    href: "https://example.org/meta.xml".to_string(),
                },
                CmrLink {
                    rel: "http://esipfed.org/ns/fedsearch/1.1/data#".to_string(),
                    href: "https://example.org/GEDI04_C_TEST.h5".to_string(),
                },
            ],
        };

        let handle = entry.into_handle();
        assert_eq!(handle.name, "GEDI04_C_TEST.h5");
        assert_eq!(
            handle.url.as_deref(),
            Some("https://example.org/GEDI04_C_TEST.h5")
        );
    }

    #[test]
    fn test_cmr_entry_falls_back_to_title() {
        let entry = CmrEntry {
            producer_granule_id: None,
            title: "SC:GEDI04_C.002:12345".to_string(),
            links: Vec::new(),
        };

        let handle = entry.into_handle();
        assert_eq!(handle.name, "SC:GEDI04_C.002:12345");
        assert!(handle.url.is_none());
    }
}
