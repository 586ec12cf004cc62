//! Point-sample extraction from hierarchical science files.
//!
//! The file reader is a collaborator: anything that can list dataset
//! paths and read a one-dimensional float dataset. Dataset lookup is
//! suffix-matched so nested group layouts (`BEAM0101/WSCI`, ...) resolve
//! without hardcoding the hierarchy.

use std::path::Path;

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::Serialize;
use tracing::warn;

use crate::geo::BoundingBox;

/// Reader over one hierarchical data file
pub trait DatasetReader {
    /// Label used in diagnostics and sample rows (usually the file name)
    fn label(&self) -> &str;

    /// Full slash-separated paths of every dataset in the file
    fn dataset_paths(&self) -> Vec<String>;

    /// Read a dataset as f64 values
    fn read_f64(&self, path: &str) -> Result<Vec<f64>>;
}

/// One extracted point sample
#[derive(Debug, Clone, Serialize)]
pub struct PointSample {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
    /// Granule the sample came from
    pub granule: String,
}

/// Find a dataset by suffix within nested groups.
///
/// Matches `.../name` or a bare top-level `name`; the first hit wins.
pub fn pick_dataset<'a>(paths: &'a [String], name: &str) -> Option<&'a str> {
    let suffix = format!("/{}", name);
    paths
        .iter()
        .find(|p| p.ends_with(&suffix) || p.as_str() == name)
        .map(|p| p.as_str())
}

/// Extract finite in-AOI samples of `variable` from one reader.
///
/// Returns None when the file lacks the variable or coordinate datasets;
/// callers skip that file and continue with the rest of the batch.
pub fn extract_samples<R: DatasetReader + ?Sized>(
    reader: &R,
    variable: &str,
    aoi: &BoundingBox,
) -> Result<Option<Vec<PointSample>>> {
    let paths = reader.dataset_paths();

    let var_path = pick_dataset(&paths, variable);
    let lat_path = pick_dataset(&paths, "lat").or_else(|| pick_dataset(&paths, "latitude"));
    let lon_path = pick_dataset(&paths, "lon").or_else(|| pick_dataset(&paths, "longitude"));

    let (Some(var_path), Some(lat_path), Some(lon_path)) = (var_path, lat_path, lon_path) else {
        warn!("skip {} (no {}/lat/lon datasets)", reader.label(), variable);
        return Ok(None);
    };

    let values = reader.read_f64(var_path)?;
    let lats = reader.read_f64(lat_path)?;
    let lons = reader.read_f64(lon_path)?;

    let mut samples = Vec::new();
    for ((lat, lon), value) in lats.iter().zip(&lons).zip(&values) {
        if lat.is_finite() && lon.is_finite() && aoi.contains(*lat, *lon) {
            samples.push(PointSample {
                lat: *lat,
                lon: *lon,
                value: *value,
                granule: reader.label().to_string(),
            });
        }
    }

    Ok(Some(samples))
}

/// Write samples as CSV with lat, lon, variable, granule columns
pub fn write_samples_csv(samples: &[PointSample], variable: &str, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(["lat", "lon", variable, "granule"])?;
    for sample in samples {
        writer.write_record(&[
            sample.lat.to_string(),
            sample.lon.to_string(),
            sample.value.to_string(),
            sample.granule.clone(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    Ok(())
}

/// Samples as a GeoJSON FeatureCollection of points
pub fn samples_to_geojson(samples: &[PointSample], variable: &str) -> FeatureCollection {
    let features = samples
        .iter()
        .map(|sample| {
            let mut properties = geojson::JsonObject::new();
            properties.insert(variable.to_string(), sample.value.into());
            properties.insert("granule".to_string(), sample.granule.clone().into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![sample.lon, sample.lat]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write samples as a GeoJSON file
pub async fn write_samples_geojson(
    samples: &[PointSample],
    variable: &str,
    path: &Path,
) -> Result<()> {
    let collection = samples_to_geojson(samples, variable);
    let json =
        serde_json::to_string(&collection).context("Failed to serialize sample GeoJSON")?;

    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeReader {
        label: String,
        datasets: Vec<(String, Vec<f64>)>,
    }

    impl DatasetReader for FakeReader {
        fn label(&self) -> &str {
            &self.label
        }

        fn dataset_paths(&self) -> Vec<String> {
            self.datasets.iter().map(|(p, _)| p.clone()).collect()
        }

        fn read_f64(&self, path: &str) -> Result<Vec<f64>> {
            self.datasets
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| anyhow::anyhow!("no dataset {}", path))
        }
    }

    fn aoi() -> BoundingBox {
        BoundingBox::new(-50.0, -1.5, -49.0, -0.5).unwrap()
    }

    #[test]
    fn test_pick_dataset_suffix_match() {
        let paths = vec![
            "BEAM0101/geolocation/lat".to_string(),
            "BEAM0101/WSCI".to_string(),
            "METADATA/latitude_units".to_string(),
        ];

        assert_eq!(pick_dataset(&paths, "WSCI"), Some("BEAM0101/WSCI"));
        assert_eq!(pick_dataset(&paths, "lat"), Some("BEAM0101/geolocation/lat"));
        // Suffix must match a whole component
        assert_eq!(pick_dataset(&paths, "latitude"), None);
        assert_eq!(pick_dataset(&paths, "lon"), None);
    }

    #[test]
    fn test_pick_dataset_top_level_match() {
        let paths = vec!["WSCI".to_string()];
        assert_eq!(pick_dataset(&paths, "WSCI"), Some("WSCI"));
    }

    #[test]
    fn test_extract_filters_to_finite_in_aoi() {
        let reader = FakeReader {
            label: "g1.h5".to_string(),
            datasets: vec![
                ("BEAM/WSCI".to_string(), vec![1.0, 2.0, 3.0, 4.0]),
                (
                    "BEAM/lat".to_string(),
                    vec![-1.0, -3.0, f64::NAN, -0.6],
                ),
                (
                    "BEAM/lon".to_string(),
                    vec![-49.5, -49.5, -49.5, -49.2],
                ),
            ],
        };

        let samples = extract_samples(&reader, "WSCI", &aoi()).unwrap().unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 1.0);
        assert_eq!(samples[1].value, 4.0);
        assert!(samples.iter().all(|s| s.granule == "g1.h5"));
    }

    #[test]
    fn test_extract_skips_file_without_variable() {
        let reader = FakeReader {
            label: "g2.h5".to_string(),
            datasets: vec![
                ("BEAM/lat".to_string(), vec![-1.0]),
                ("BEAM/lon".to_string(), vec![-49.5]),
            ],
        };

        assert!(extract_samples(&reader, "WSCI", &aoi()).unwrap().is_none());
    }

    #[test]
    fn test_extract_accepts_long_coordinate_names() {
        let reader = FakeReader {
            label: "g3.h5".to_string(),
            datasets: vec![
                ("BEAM/WSCI".to_string(), vec![7.0]),
                ("BEAM/latitude".to_string(), vec![-1.0]),
                ("BEAM/longitude".to_string(), vec![-49.5]),
            ],
        };

        let samples = extract_samples(&reader, "WSCI", &aoi()).unwrap().unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_csv_export_columns() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("samples.csv");
        let samples = vec![PointSample {
            lat: -1.0,
            lon: -49.5,
            value: 1.5,
            granule: "g1.h5".to_string(),
        }];

        write_samples_csv(&samples, "WSCI", &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("lat,lon,WSCI,granule"));
        assert_eq!(lines.next(), Some("-1,-49.5,1.5,g1.h5"));
    }

    #[test]
    fn test_geojson_feature_per_sample() {
        let samples = vec![
            PointSample {
                lat: -1.0,
                lon: -49.5,
                value: 1.5,
                granule: "g1.h5".to_string(),
            },
            PointSample {
                lat: -0.8,
                lon: -49.3,
                value: 2.5,
                granule: "g1.h5".to_string(),
            },
        ];

        let collection = samples_to_geojson(&samples, "WSCI");
        assert_eq!(collection.features.len(), 2);

        let first = &collection.features[0];
        assert_eq!(
            first.properties.as_ref().unwrap().get("WSCI").unwrap(),
            &serde_json::json!(1.5)
        );
    }
}
