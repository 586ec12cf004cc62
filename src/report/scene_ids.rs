//! Scene-ID extraction from evidence sources.
//!
//! Report generation pulls structured scene identifiers out of free-form
//! source id strings. The rules live in one ordered table so the behavior
//! stays auditable:
//!
//! 1. ALOS family (type mentions alos2/alos-2/palsar): collect
//!    `ALOS...` tokens from the primary source id
//! 2. Sentinel-1 (type mentions sentinel-1, or the id mentions s1):
//!    split on explicit `WET:`/`DRY:` sub-labels and collect `S1...`
//!    tokens per season; without sub-labels the tokens are pooled
//!    unlabeled and split first-half wet, second-half dry
//!
//! Only the primary (first) source of each record is scanned. All pools
//! are de-duplicated order-preserving and capped for quoting in a
//! write-up.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::EvidenceRecord;

/// Maximum ALOS scene IDs quoted per write-up
const MAX_ALOS: usize = 4;

/// Maximum Sentinel-1 scene IDs quoted per season
const MAX_S1: usize = 3;

/// Pool a matched token lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Alos,
    S1,
}

/// One extraction rule matched against a record's primary source
struct IdRule {
    /// Substrings matched case-insensitively against the source type
    type_markers: &'static [&'static str],
    /// Substrings matched case-insensitively against the source id
    id_markers: &'static [&'static str],
    /// Scene-ID token pattern
    token: fn() -> &'static Regex,
    pool: Pool,
}

/// Ordered extraction rules
const RULES: &[IdRule] = &[
    IdRule {
        type_markers: &["alos2", "alos-2", "palsar"],
        id_markers: &[],
        token: alos_token_re,
        pool: Pool::Alos,
    },
    IdRule {
        type_markers: &["sentinel-1"],
        id_markers: &["sentinel-1", "s1"],
        token: s1_token_re,
        pool: Pool::S1,
    },
];

fn alos_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ALOS[0-9A-Z_\-]+").unwrap())
}

fn s1_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"S1[A-Z0-9_]+").unwrap())
}

fn wet_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"WET:\s*([^;]+)").unwrap())
}

fn dry_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"DRY:\s*([^;]+)").unwrap())
}

/// Scene identifiers extracted from selected evidence records
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SceneIds {
    pub alos: Vec<String>,
    pub s1_wet: Vec<String>,
    pub s1_dry: Vec<String>,
}

/// Extract scene IDs from the primary source of each record.
pub fn extract_scene_ids(records: &[EvidenceRecord]) -> SceneIds {
    let mut alos = Vec::new();
    let mut wet = Vec::new();
    let mut dry = Vec::new();
    let mut unlabeled = Vec::new();

    for record in records {
        let Some(source) = record.primary_source() else {
            continue;
        };
        let source_type = source.source_type.to_lowercase();
        let id_lower = source.id.to_lowercase();

        for rule in RULES {
            let type_hit = rule.type_markers.iter().any(|m| source_type.contains(m));
            let id_hit = rule.id_markers.iter().any(|m| id_lower.contains(m));
            if !type_hit && !id_hit {
                continue;
            }

            match rule.pool {
                Pool::Alos => alos.extend(tokens((rule.token)(), &source.id)),
                Pool::S1 => {
                    let wet_part = wet_label_re()
                        .captures(&source.id)
                        .map(|c| c[1].to_string());
                    let dry_part = dry_label_re()
                        .captures(&source.id)
                        .map(|c| c[1].to_string());

                    if let Some(part) = &wet_part {
                        wet.extend(tokens((rule.token)(), part));
                    }
                    if let Some(part) = &dry_part {
                        dry.extend(tokens((rule.token)(), part));
                    }
                    if wet_part.is_none() && dry_part.is_none() {
                        unlabeled.extend(tokens((rule.token)(), &source.id));
                    }
                }
            }
        }
    }

    let mut alos = dedup(&alos);
    alos.truncate(MAX_ALOS);
    let mut s1_wet = dedup(&wet);
    s1_wet.truncate(MAX_S1);
    let mut s1_dry = dedup(&dry);
    s1_dry.truncate(MAX_S1);

    // Documented fallback: no explicit sub-labels anywhere, so the
    // unlabeled tokens split first half wet, second half dry
    if s1_wet.is_empty() && s1_dry.is_empty() && !unlabeled.is_empty() {
        let half = (unlabeled.len() / 2).max(1);
        s1_wet = dedup(&unlabeled[..half]);
        s1_wet.truncate(MAX_S1);
        s1_dry = dedup(&unlabeled[half..]);
        s1_dry.truncate(MAX_S1);
    }

    SceneIds { alos, s1_wet, s1_dry }
}

fn tokens(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Order-preserving de-duplication
fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id.clone()) {
            out.push(id.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataSource;

    fn record_with_source(source_type: &str, id: &str) -> EvidenceRecord {
        EvidenceRecord::new(-1.0, -49.5, "cand-a", vec![DataSource::new(source_type, id)])
    }

    #[test]
    fn test_alos_tokens_from_typed_source() {
        let records = vec![record_with_source(
            "ALOS-2 PALSAR-2 (HH)",
            "ALOS2499992970-230915, ALOS2505142970-231020",
        )];

        let ids = extract_scene_ids(&records);
        assert_eq!(
            ids.alos,
            vec!["ALOS2499992970-230915", "ALOS2505142970-231020"]
        );
        assert!(ids.s1_wet.is_empty());
    }

    #[test]
    fn test_s1_wet_dry_sub_labels() {
        let records = vec![record_with_source(
            "Sentinel-1 VV",
            "WET: S1A_IW_20230115, S1A_IW_20230127; DRY: S1A_IW_20230817",
        )];

        let ids = extract_scene_ids(&records);
        assert_eq!(ids.s1_wet, vec!["S1A_IW_20230115", "S1A_IW_20230127"]);
        assert_eq!(ids.s1_dry, vec!["S1A_IW_20230817"]);
    }

    #[test]
    fn test_s1_unlabeled_half_split() {
        let records = vec![record_with_source(
            "Sentinel-1 VV",
            "S1A_A, S1A_B, S1A_C, S1A_D",
        )];

        let ids = extract_scene_ids(&records);
        assert_eq!(ids.s1_wet, vec!["S1A_A", "S1A_B"]);
        assert_eq!(ids.s1_dry, vec!["S1A_C", "S1A_D"]);
    }

    #[test]
    fn test_s1_matched_by_id_marker() {
        // Type gives nothing away; the id itself mentions s1
        let records = vec![record_with_source("SAR backscatter", "s1 stack: S1B_X")];

        let ids = extract_scene_ids(&records);
        assert_eq!(ids.s1_wet, vec!["S1B_X"]);
    }

    #[test]
    fn test_dedup_preserves_order_and_caps() {
        let records = vec![record_with_source(
            "ALOS-2",
            "ALOS_A ALOS_B ALOS_A ALOS_C ALOS_D ALOS_E",
        )];

        let ids = extract_scene_ids(&records);
        assert_eq!(ids.alos, vec!["ALOS_A", "ALOS_B", "ALOS_C", "ALOS_D"]);
    }

    #[test]
    fn test_only_primary_source_is_scanned() {
        let mut record = record_with_source("Sentinel-2", "S2A_TILE");
        record.sources.push(DataSource::new("ALOS-2", "ALOS_HIDDEN"));

        let ids = extract_scene_ids(&[record]);
        assert!(ids.alos.is_empty());
    }

    #[test]
    fn test_sourceless_records_are_skipped() {
        let record = EvidenceRecord::new(0.0, 0.0, "cand-a", Vec::new());
        assert_eq!(extract_scene_ids(&[record]), SceneIds::default());
    }
}
