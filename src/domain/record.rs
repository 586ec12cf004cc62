//! Evidence record types for the append-only provenance ledger.
//!
//! One record links a candidate observation to the external datasets that
//! back it. Records are immutable once created: the ledger only appends,
//! never updates or deletes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::BoundingBox;
use crate::ledger::sha256_hex;

/// One external dataset backing a claim.
///
/// When a record carries several sources their order is preserved; the
/// first entry is the primary one consumed by report generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    /// Dataset family, e.g. "Sentinel-2", "GEDI04_C v2 (WSCI)"
    #[serde(rename = "type")]
    pub source_type: String,

    /// Scene/tile/granule/DOI identifier
    pub id: String,

    /// Landing page or download URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DataSource {
    /// Create a source without a URL
    pub fn new(source_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            id: id.into(),
            url: None,
        }
    }

    /// Attach a landing page or download URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Attribution for records produced by an automated model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
}

/// A single provenance entry in the evidence ledger.
///
/// The timestamp is assigned at construction and never mutated. Prompt and
/// output text are fingerprinted at construction; the plaintext is not
/// retained. Unset optional fields are absent from the serialized record
/// rather than null or empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Creation instant (UTC, ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied identifier grouping related evidence (not unique)
    pub candidate_id: String,

    /// Anchor latitude of the evidence, degrees
    pub lat: f64,

    /// Anchor longitude of the evidence, degrees
    pub lon: f64,

    /// AOI extent as [min_lon, min_lat, max_lon, max_lat]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// External datasets backing the claim, primary first
    #[serde(default)]
    pub sources: Vec<DataSource>,

    /// Model attribution for automated records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelInfo>,

    /// SHA-256 of the prompt text that produced this record, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_sha256: Option<String>,

    /// SHA-256 of the model output text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_sha256: Option<String>,

    /// Free-text notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Forward-compatible open fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EvidenceRecord {
    /// Create a record with the current timestamp and required fields
    pub fn new(
        lat: f64,
        lon: f64,
        candidate_id: impl Into<String>,
        sources: Vec<DataSource>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            candidate_id: candidate_id.into(),
            lat,
            lon,
            bbox: None,
            sources,
            model: None,
            prompt_sha256: None,
            output_sha256: None,
            notes: None,
            extra: BTreeMap::new(),
        }
    }

    /// Attach the AOI extent
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Attach model attribution
    pub fn with_model(mut self, model: ModelInfo) -> Self {
        self.model = Some(model);
        self
    }

    /// Fingerprint the prompt text; the text itself is not stored
    pub fn with_prompt_text(mut self, text: &str) -> Self {
        self.prompt_sha256 = Some(sha256_hex(text));
        self
    }

    /// Fingerprint the model output text; the text itself is not stored
    pub fn with_output_text(mut self, text: &str) -> Self {
        self.output_sha256 = Some(sha256_hex(text));
        self
    }

    /// Attach free-text notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attach one forward-compatible extra field
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The primary (first) data source, if any
    pub fn primary_source(&self) -> Option<&DataSource> {
        self.sources.first()
    }
}
