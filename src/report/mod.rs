//! Write-up package generation.
//!
//! Renders a Markdown candidate package from pipeline exports: the
//! hydro-plausibility scores CSV, the rendered overview figure, and scene
//! IDs pulled from matching evidence records. The raster pipeline itself
//! is external; this module only consumes its exported artifacts.

pub mod scene_ids;

pub use scene_ids::{extract_scene_ids, SceneIds};

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::domain::EvidenceRecord;

/// One row of hotspots_scores.csv
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRow {
    /// 1-indexed candidate rank from the selection step
    pub idx: u32,

    /// Candidate polygon area in hectares
    #[serde(default)]
    pub area_ha: f64,

    /// Pixels inside the polygon mask
    #[serde(default)]
    pub pix: u64,

    /// Fraction of pixels passing the hydro-plausibility test
    #[serde(default)]
    pub frac_ok: f64,
}

/// Read the scores CSV exported by the candidate pipeline.
///
/// A missing or empty file is fatal: there is nothing to write up until
/// the pipeline has run.
pub fn read_scores(path: &Path) -> Result<Vec<ScoreRow>> {
    if !path.exists() {
        bail!("Missing {}. Run the candidate pipeline first", path.display());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to read scores: {}", path.display()))?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: ScoreRow =
            row.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("Scores CSV is empty: {}", path.display());
    }

    Ok(rows)
}

/// Best row by hydro-plausibility fraction
pub fn best_score(rows: &[ScoreRow]) -> Option<&ScoreRow> {
    rows.iter().max_by(|a, b| a.frac_ok.total_cmp(&b.frac_ok))
}

/// Display name for a known AOI prefix, title-cased otherwise
pub fn display_name(prefix: &str) -> String {
    match prefix.to_lowercase().as_str() {
        "marajo" => "Marajó".to_string(),
        "santarem" => "Santarém–Óbidos".to_string(),
        "tapajos" => "Tapajós".to_string(),
        other => title_case(other),
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Expected overview figure for a candidate rank, with a glob fallback to
/// any rendered overview in the prefix figure directory.
pub fn find_overview_figure(fig_dir: &Path, prefix: &str, idx: u32) -> PathBuf {
    let expected = fig_dir.join(format!("{}-hot-01{:02}_overview.png", prefix, idx));
    if expected.exists() {
        return expected;
    }

    let pattern = fig_dir.join("*_overview.png");
    if let Ok(paths) = glob::glob(&pattern.to_string_lossy()) {
        let mut found: Vec<PathBuf> = paths.flatten().collect();
        found.sort();
        if let Some(first) = found.into_iter().next() {
            return first;
        }
    }

    expected
}

/// Inputs resolved for one write-up
#[derive(Debug)]
pub struct Writeup {
    pub prefix: String,
    pub rank: u32,
    pub area_ha: f64,
    pub frac_ok: f64,
    pub figure: PathBuf,
    pub scene_ids: SceneIds,
}

impl Writeup {
    /// Render the candidate package as Markdown
    pub fn render(&self) -> String {
        let alos = ids_or_fallback(&self.scene_ids.alos);
        let s1_wet = ids_or_fallback(&self.scene_ids.s1_wet);
        let s1_dry = ids_or_fallback(&self.scene_ids.s1_dry);
        let figure = self.figure.to_string_lossy().replace('\\', "/");

        format!(
            r#"# {name} — Seasonal Δ Candidate Package (v1)

**Selected candidate:** rank {rank} — area ≈ {area:.2} ha — hydro score frac_ok ≈ {frac:.3}

## Methods
- Built wet–dry seasonal composites and Δ = wet − dry for ALOS-2 (HH, γ⁰ dB) and Sentinel-1 VV.
- Thresholded / denoised / coarsened S1 Δ → hotspots; kept Top-N by area.
- Simple plausibility: Δ>0 & relative elevation ≤ 5 m (DEM 30 m, HAND-like).

**Scene ID samples**
- **ALOS-2:** {alos}
- **S1 wet:** {s1_wet}
- **S1 dry:** {s1_dry}

**Figure**
![Overview]({figure})

*Left:* ALOS-2 Δ (colorized) — if exported. *Right:* S1 VV Δ (RGB or dB). Yellow outline = candidate.

## Evidence & Reproducibility
- Evidence lines: `logs/evidence_log.jsonl` (filter by prefix or candidate_id).
- AOI inputs: `data/exports/{prefix}_*`
- Outputs: `data/candidates/{prefix}/` and `figures/{prefix}/`
"#,
            name = display_name(&self.prefix),
            rank = self.rank,
            area = self.area_ha,
            frac = self.frac_ok,
            alos = alos,
            s1_wet = s1_wet,
            s1_dry = s1_dry,
            figure = figure,
            prefix = self.prefix,
        )
    }
}

fn ids_or_fallback(ids: &[String]) -> String {
    if ids.is_empty() {
        "see evidence log".to_string()
    } else {
        ids.join(", ")
    }
}

/// Generate the write-up stub for an AOI prefix.
///
/// Reads scores from `<data_dir>/candidates/<prefix>/hotspots_scores.csv`,
/// figures from `<figures_dir>/<prefix>/`, scene IDs from the given
/// records. Writes `<reports_dir>/<prefix>-candidate.md` unless `outfile`
/// overrides the destination.
pub fn generate_writeup(
    prefix: &str,
    records: &[EvidenceRecord],
    data_dir: &Path,
    figures_dir: &Path,
    reports_dir: &Path,
    outfile: Option<&Path>,
) -> Result<PathBuf> {
    let scores_path = data_dir
        .join("candidates")
        .join(prefix)
        .join("hotspots_scores.csv");
    let rows = read_scores(&scores_path)?;
    let top = best_score(&rows).context("Scores CSV has no rows")?;

    let figure = find_overview_figure(&figures_dir.join(prefix), prefix, top.idx);

    let writeup = Writeup {
        prefix: prefix.to_string(),
        rank: top.idx,
        area_ha: top.area_ha,
        frac_ok: top.frac_ok,
        figure,
        scene_ids: extract_scene_ids(records),
    };

    let out = match outfile {
        Some(path) => path.to_path_buf(),
        None => {
            std::fs::create_dir_all(reports_dir).with_context(|| {
                format!("Failed to create reports directory: {}", reports_dir.display())
            })?;
            reports_dir.join(format!("{}-candidate.md", prefix))
        }
    };

    std::fs::write(&out, writeup.render())
        .with_context(|| format!("Failed to write {}", out.display()))?;

    Ok(out)
}
