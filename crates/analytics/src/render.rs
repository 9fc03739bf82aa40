//! CSV chart renderer
//!
//! Writes the requested columns as a timestamped CSV next to the other run
//! artifacts. CSV rather than an image keeps the artifact diffable and easy
//! for an agent to re-ingest; a plotting front end can consume the same
//! file.

use log::info;
use meridian_core::Frame;
use meridian_ports::{ArtifactRenderer, ChartSpec, ComputeError};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct CsvChartRenderer;

impl ArtifactRenderer for CsvChartRenderer {
    fn render(
        &self,
        frame: &Frame,
        computed: &BTreeMap<String, Vec<f64>>,
        spec: &ChartSpec,
        dir: &Path,
    ) -> Result<PathBuf, ComputeError> {
        let columns: Vec<String> = if spec.columns.is_empty() {
            vec!["close".to_string()]
        } else {
            spec.columns.clone()
        };

        let mut series = Vec::with_capacity(columns.len());
        for column in &columns {
            let values = frame
                .column(column)
                .or_else(|| computed.get(column).cloned())
                .ok_or_else(|| {
                    let mut available: Vec<&str> =
                        Frame::column_names().to_vec();
                    available.extend(computed.keys().map(String::as_str));
                    ComputeError::Invalid(format!(
                        "unknown chart column '{column}' (available: {})",
                        available.join(", ")
                    ))
                })?;
            if values.len() != frame.len() {
                return Err(ComputeError::Invalid(format!(
                    "column '{column}' has {} values for {} bars",
                    values.len(),
                    frame.len()
                )));
            }
            series.push(values);
        }

        let mut body = String::new();
        if let Some(title) = &spec.title {
            let _ = writeln!(body, "# {title}");
        }
        let _ = writeln!(body, "time,{}", columns.join(","));
        for (row, time) in frame.times().iter().enumerate() {
            let _ = write!(body, "{}", time.to_rfc3339());
            for values in &series {
                let v = values[row];
                if v.is_finite() {
                    let _ = write!(body, ",{v}");
                } else {
                    body.push(',');
                }
            }
            body.push('\n');
        }

        fs::create_dir_all(dir).map_err(|e| ComputeError::Failed(e.to_string()))?;
        let path = dir.join(file_name(spec));
        fs::write(&path, body).map_err(|e| ComputeError::Failed(e.to_string()))?;
        info!("chart artifact written: {}", path.display());
        Ok(path)
    }
}

/// Caller-provided stem with path components stripped, or a generated name
fn file_name(spec: &ChartSpec) -> String {
    let stem = match &spec.filename {
        Some(name) => {
            let cleaned: String = name
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
                .collect();
            if cleaned.is_empty() {
                generated_stem()
            } else {
                cleaned
            }
        }
        None => generated_stem(),
    };
    format!("{stem}.csv")
}

fn generated_stem() -> String {
    format!("chart_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use meridian_core::Bar;
    use rust_decimal_macros::dec;

    fn frame(n: usize) -> Frame {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let bars = (0..n)
            .map(|i| Bar {
                time: start + Duration::hours(i as i64),
                open: dec!(1.0),
                high: dec!(1.2),
                low: dec!(0.9),
                close: dec!(1.1),
                tick_volume: 10,
                spread: 1,
                real_volume: 0,
            })
            .collect();
        Frame::new(bars)
    }

    #[test]
    fn writes_builtin_and_computed_columns() {
        let dir = std::env::temp_dir().join(format!("meridian-render-{}", Uuid::new_v4()));
        let mut computed = BTreeMap::new();
        computed.insert("sma_3".to_string(), vec![f64::NAN, f64::NAN, 1.1, 1.1, 1.1]);

        let spec = ChartSpec {
            columns: vec!["close".to_string(), "sma_3".to_string()],
            filename: Some("test-chart".to_string()),
            title: Some("demo".to_string()),
        };
        let path = CsvChartRenderer
            .render(&frame(5), &computed, &spec, &dir)
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "test-chart.csv");

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# demo\ntime,close,sma_3\n"));
        // NaN cells are empty, not "NaN"
        assert!(written.contains("T00:00:00+00:00,1.1,\n"));
        assert!(written.contains("T04:00:00+00:00,1.1,1.1\n"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_column_is_rejected() {
        let dir = std::env::temp_dir();
        let spec = ChartSpec {
            columns: vec!["vwap".to_string()],
            filename: None,
            title: None,
        };
        let err = CsvChartRenderer
            .render(&frame(3), &BTreeMap::new(), &spec, &dir)
            .unwrap_err();
        assert!(matches!(err, ComputeError::Invalid(_)));
    }

    #[test]
    fn filename_is_sanitized() {
        let spec = ChartSpec {
            columns: vec![],
            filename: Some("../../etc/passwd".to_string()),
            title: None,
        };
        let name = file_name(&spec);
        assert!(!name.contains('/'));
        assert!(name.ends_with(".csv"));
    }
}
