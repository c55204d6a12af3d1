//! # Stages
//!
//! Built-in baseline implementations of the three pipeline stages over CSV
//! input:
//!
//! | Stage   | Behaviour                                              | Output          |
//! |---------|--------------------------------------------------------|-----------------|
//! | prepare | sort by `time`, forward then backward fill empty cells | `processed.csv` |
//! | fit     | nearest-centroid or majority classifier on `label`     | `model.json`    |
//! | score   | accuracy and weighted precision/recall/F1 on hold-out   | `metrics.json`  |

mod model;
mod prepare;
mod score;
mod table;

use std::path::{Path, PathBuf};

use contracts::{Metrics, StageResult, Stages};

pub use model::{
    split_counts, Model, ModelFile, LABEL_COLUMN, MODEL_FILE, VARIANT_BASELINE, VARIANT_MAJORITY,
};
pub use prepare::{PROCESSED_FILE, TIME_COLUMN};
pub use score::classification_metrics;
pub use table::Table;

/// Baseline stage set
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineStages;

impl Stages for BaselineStages {
    fn prepare(&self, source: &Path, out_dir: &Path) -> StageResult<PathBuf> {
        prepare::prepare(source, out_dir)
    }

    fn fit(&self, processed: &Path, out_dir: &Path, variant: &str) -> StageResult<PathBuf> {
        model::fit(processed, out_dir, variant)
    }

    fn score(&self, processed: &Path, model: &Path, out_dir: &Path) -> StageResult<Metrics> {
        score::score(processed, model, out_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::METRICS_FILE;
    use std::fs;

    #[test]
    fn test_full_chain() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("sensor.csv");
        let mut csv = String::from("time,temp,label\n");
        for t in (0..30).rev() {
            let (temp, label) = if t % 2 == 0 { (20 + t % 5, "ok") } else { (80 + t % 5, "hot") };
            // a few gaps for the fill step
            if t % 7 == 0 {
                csv.push_str(&format!("{t},,{label}\n"));
            } else {
                csv.push_str(&format!("{t},{temp},{label}\n"));
            }
        }
        fs::write(&src, csv).unwrap();

        let stages = BaselineStages;
        let processed = stages.prepare(&src, &dir.path().join("processed")).unwrap();
        let model = stages
            .fit(&processed, &dir.path().join("model"), "baseline")
            .unwrap();
        let metrics = stages
            .score(&processed, &model, &dir.path().join("metrics"))
            .unwrap();

        assert_eq!(metrics["val_samples"], 6.0);
        for key in ["accuracy", "precision", "recall", "f1"] {
            let v = metrics[key];
            assert!((0.0..=1.0).contains(&v), "{key}={v}");
        }
        assert!(dir.path().join("metrics").join(METRICS_FILE).is_file());
    }
}
