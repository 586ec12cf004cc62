//! terralog - remote-sensing evidence and provenance toolkit
//!
//! Glue for a satellite exploration workflow: search and download data
//! granules, extract point samples through collaborator traits, and record
//! provenance for candidate observations in an append-only ledger.
//!
//! # Architecture
//!
//! The system is built around the evidence ledger:
//! - Every claimed observation is recorded as one immutable JSONL line
//! - Reports are derived by re-reading and filtering the ledger
//! - Raster and hierarchical-file processing stay behind trait seams
//!
//! # Modules
//!
//! - `ledger`: Append-only evidence store
//! - `domain`: Data structures (EvidenceRecord, DataSource, Aoi)
//! - `geo`: Bounding-box helpers
//! - `ingest`: Granule search/download and point-sample extraction
//! - `report`: Write-up generation and scene-ID extraction
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Log a candidate evidence line
//! terralog candidate --lat -10.0 --lon -52.0 \
//!     --dataset-type Sentinel-2 --dataset-id S2A_TEST_TILE
//!
//! # Generate a write-up stub for an AOI prefix
//! terralog writeup --prefix marajo
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod geo;
pub mod ingest;
pub mod ledger;
pub mod report;

// Re-export main types at crate root for convenience
pub use domain::{Aoi, DataSource, EvidenceRecord, ModelInfo};
pub use geo::{bbox_from_center, BoundingBox};
pub use ingest::{GranuleHandle, GranuleQuery, GranuleSearch, SearchError};
pub use ledger::{sha256_hex, EvidenceLedger};
pub use report::{extract_scene_ids, SceneIds};
