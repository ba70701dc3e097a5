// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per training epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number
//   - mean_loss:     average masked cross-entropy over the
//                    epoch's full batches
//   - lr:            learning rate the epoch ran with
//   - batches:       number of optimiser steps taken
//   - skipped:       batches handed to the loop that were not
//                    full and therefore not trained on
//   - triple_recall: fraction of ground-truth triples that the
//                    frozen extractor selected over the noisy
//                    channel
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,mean_loss,lr,batches,skipped,triple_recall
//   1,5.812340,0.000100000,412,0,0.413200
//   ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:         usize,
    pub mean_loss:     f64,
    pub lr:            f64,
    pub batches:       usize,
    pub skipped:       usize,
    /// In [0, 1]; NaN when the epoch saw no ground-truth triples.
    pub triple_recall: f64,
}

impl EpochMetrics {
    pub fn is_improvement(&self, best_loss: f64) -> bool {
        self.mean_loss < best_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// resumed runs keep appending to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,mean_loss,lr,batches,skipped,triple_recall")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.9},{},{},{:.6}",
            m.epoch, m.mean_loss, m.lr, m.batches, m.skipped, m.triple_recall,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: mean_loss={:.4}, recall={:.3}",
            m.epoch,
            m.mean_loss,
            m.triple_recall,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, mean_loss: f64) -> EpochMetrics {
        EpochMetrics { epoch, mean_loss, lr: 1e-4, batches: 3, skipped: 1, triple_recall: 0.25 }
    }

    #[test]
    fn test_is_improvement() {
        let m = metrics(2, 2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1, 4.5)).unwrap();

        // A second logger on the same directory must not rewrite the header.
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&metrics(2, 4.0)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,mean_loss,lr,batches,skipped,triple_recall");
        assert_eq!(lines[1], "1,4.500000,0.000100000,3,1,0.250000");
        assert!(lines[2].starts_with("2,4.000000,"));
    }
}
