// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Why log metrics to CSV?
//   - Easy to open in Excel or Google Sheets
//   - Can plot learning curves to diagnose training issues
//   - Provides a permanent record of each training run
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: average cross-entropy loss on training set
//   - val_loss:   average cross-entropy loss on validation set
//   - accuracy:   fraction of validation answers predicted right
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,accuracy
//   1,0.712400,0.698200,0.510000
//   2,0.655100,0.671300,0.580000
//   ...
//
// How to read the metrics:
//   - Loss should decrease each epoch (model is learning)
//   - If val_loss increases while train_loss decreases → overfitting
//   - Accuracy much above 0.5 means better than guessing on a
//     balanced true/false set
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over all training batches
    /// Lower is better. Random initialisation gives ~ln(2)
    pub train_loss: f64,

    /// Average cross-entropy loss on the validation set
    /// Should track train_loss — divergence indicates overfitting
    pub val_loss: f64,

    /// Fraction of validation labels predicted exactly correctly
    /// Range: [0.0, 1.0] — 0.5 is chance level on balanced data
    pub accuracy: f64,
}

impl EpochMetrics {
    /// Create a new EpochMetrics record
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, accuracy: f64) -> Self {
        Self { epoch, train_loss, val_loss, accuracy }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());

        // Create directory if it doesn't exist
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Write CSV header only if file is new
        // This allows appending to an existing log across runs
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    ///
    /// Uses OpenOptions with append=true so we add to the file
    /// without overwriting previous epochs.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        // One CSV row with 6 decimal places for each metric
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 0.61, 0.58, 0.7);
        // 0.58 < 0.65 → this is an improvement
        assert!(m.is_improvement(0.65));
        // 0.58 is NOT less than 0.5 → not an improvement
        assert!(!m.is_improvement(0.5));
    }

    #[test]
    fn test_rows_append_across_loggers() {
        let dir = tempfile::tempdir().unwrap();
        let dir_string = dir.path().to_string_lossy().into_owned();

        let logger = MetricsLogger::new(dir_string.clone()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.7, 0.69, 0.5)).unwrap();

        // A second logger over the same directory keeps the file.
        let logger = MetricsLogger::new(dir_string).unwrap();
        logger.log(&EpochMetrics::new(2, 0.6, 0.62, 0.6)).unwrap();

        let content = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,val_loss,accuracy");
        assert!(lines[1].starts_with("1,"));
        assert!(lines[2].starts_with("2,"));
    }
}
