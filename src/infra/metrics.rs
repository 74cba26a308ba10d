// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends a row of packing statistics to a CSV file every N
// emitted items, so operators can watch fill ratio and spot a
// dataset that restarts far more often than expected.
//
// Output file: <output_dir>/metrics.csv
//
//   items,records,restarts,fill_ratio,trainable_fraction,skipped_over_length,skipped_empty
//   1000,3412,0,0.973120,0.412007,2,0
//   2000,6830,1,0.972845,0.411530,4,0

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::data::emitter::EmitterStats;

const HEADER: &str =
    "items,records,restarts,fill_ratio,trainable_fraction,skipped_over_length,skipped_empty";

/// One row of the metrics CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingMetrics {
    pub items:               u64,
    pub records:             u64,
    pub restarts:            u64,
    pub fill_ratio:          f64,
    pub trainable_fraction:  f64,
    pub skipped_over_length: u64,
    pub skipped_empty:       u64,
}

impl PackingMetrics {
    pub fn from_stats(stats: &EmitterStats, max_window_len: usize) -> Self {
        Self {
            items:               stats.items_emitted,
            records:             stats.records_pulled,
            restarts:            stats.restarts,
            fill_ratio:          stats.fill_ratio(max_window_len),
            trainable_fraction:  stats.trainable_fraction(),
            skipped_over_length: stats.skipped_over_length,
            skipped_empty:       stats.skipped_empty,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a fresh CSV with just the header. A previous run's
    /// rows are discarded, like items.jsonl next to it.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &PackingMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{},{:.6},{:.6},{},{}",
            m.items,
            m.records,
            m.restarts,
            m.fill_ratio,
            m.trainable_fraction,
            m.skipped_over_length,
            m.skipped_empty,
        )?;

        tracing::debug!(
            "Logged metrics at {} items: fill={:.4}, trainable={:.4}",
            m.items,
            m.fill_ratio,
            m.trainable_fraction,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> EmitterStats {
        EmitterStats {
            records_pulled: 30,
            items_emitted: 4,
            tokens_emitted: 36,
            trainable_tokens: 9,
            restarts: 1,
            ..EmitterStats::default()
        }
    }

    #[test]
    fn test_from_stats() {
        let m = PackingMetrics::from_stats(&stats(), 10);
        assert!((m.fill_ratio - 0.9).abs() < 1e-9);
        assert!((m.trainable_fraction - 0.25).abs() < 1e-9);
        assert_eq!(m.restarts, 1);
    }

    #[test]
    fn test_header_then_appended_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&PackingMetrics::from_stats(&stats(), 10)).unwrap();
        logger.log(&PackingMetrics::from_stats(&stats(), 10)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "4,30,1,0.900000,0.250000,0,0");
    }

    #[test]
    fn test_create_discards_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&PackingMetrics::from_stats(&stats(), 10)).unwrap();

        let logger = MetricsLogger::create(dir.path()).unwrap();
        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![HEADER]);
    }
}
