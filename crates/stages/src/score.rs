//! score: evaluate the model on the held-out rows

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use contracts::{Metrics, StageError, StageResult, METRICS_FILE};
use tracing::debug;

use crate::model::{label_column, split_counts, Model};
use crate::table::Table;

pub fn score(processed: &Path, model_path: &Path, out_dir: &Path) -> StageResult<Metrics> {
    let model = Model::load(model_path)?;
    let table = Table::read(processed)?;
    let label_col = label_column(&table)?;
    let (train_rows, _) =
        split_counts(table.len()).ok_or_else(|| StageError::invalid_input("insufficient data"))?;

    let holdout = &table.rows[train_rows..];
    let truth: Vec<&str> = holdout.iter().map(|r| r[label_col].as_str()).collect();
    let predicted: Vec<String> = holdout
        .iter()
        .map(|r| model.model.predict(&table, r))
        .collect();
    let predicted: Vec<&str> = predicted.iter().map(String::as_str).collect();

    let metrics = classification_metrics(&truth, &predicted);

    std::fs::create_dir_all(out_dir)?;
    let out = out_dir.join(METRICS_FILE);
    let writer = BufWriter::new(File::create(&out)?);
    serde_json::to_writer_pretty(writer, &metrics)
        .map_err(|e| StageError::other("failed to write metrics", e))?;

    debug!(val_samples = truth.len(), path = %out.display(), "metrics written");
    Ok(metrics)
}

/// Accuracy plus support-weighted precision, recall and F1.
/// Undefined ratios count as 0.
pub fn classification_metrics(truth: &[&str], predicted: &[&str]) -> Metrics {
    let n = truth.len();
    let mut support: BTreeMap<&str, usize> = BTreeMap::new();
    let mut predicted_count: BTreeMap<&str, usize> = BTreeMap::new();
    let mut true_positive: BTreeMap<&str, usize> = BTreeMap::new();
    let mut correct = 0usize;

    for (&t, &p) in truth.iter().zip(predicted) {
        *support.entry(t).or_insert(0) += 1;
        *predicted_count.entry(p).or_insert(0) += 1;
        if t == p {
            correct += 1;
            *true_positive.entry(t).or_insert(0) += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for (label, &s) in &support {
        let tp = true_positive.get(label).copied().unwrap_or(0);
        let p = ratio(tp, predicted_count.get(label).copied().unwrap_or(0));
        let r = ratio(tp, s);
        let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        let weight = ratio(s, n);
        precision += weight * p;
        recall += weight * r;
        f1 += weight * f;
    }

    Metrics::from([
        ("accuracy".to_string(), ratio(correct, n)),
        ("precision".to_string(), precision),
        ("recall".to_string(), recall),
        ("f1".to_string(), f1),
        ("val_samples".to_string(), n as f64),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fit;
    use std::fs;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let m = classification_metrics(&["a", "b", "a"], &["a", "b", "a"]);
        assert!(close(m["accuracy"], 1.0));
        assert!(close(m["f1"], 1.0));
        assert!(close(m["val_samples"], 3.0));
    }

    #[test]
    fn test_weighted_metrics() {
        // a: support 2, predicted 3 (tp 2); b: support 2, predicted 1 (tp 1)
        let m = classification_metrics(&["a", "a", "b", "b"], &["a", "a", "a", "b"]);
        assert!(close(m["accuracy"], 0.75));
        // precision: 0.5 * 2/3 + 0.5 * 1 = 0.8333
        assert!(close(m["precision"], 0.5 * (2.0 / 3.0) + 0.5));
        // recall: 0.5 * 1 + 0.5 * 0.5 = 0.75
        assert!(close(m["recall"], 0.75));
    }

    #[test]
    fn test_never_predicted_class_counts_zero() {
        let m = classification_metrics(&["a", "b"], &["a", "a"]);
        assert!(close(m["precision"], 0.25));
        assert!(close(m["recall"], 0.5));
    }

    #[test]
    fn test_score_writes_metrics_file() {
        let dir = tempfile::tempdir().unwrap();
        let processed = dir.path().join("processed.csv");
        let mut csv = String::from("x,label\n");
        for i in 0..10 {
            csv.push_str(&format!("{},low\n{},high\n", i, 50 + i));
        }
        fs::write(&processed, csv).unwrap();

        let model = fit(&processed, dir.path(), "baseline").unwrap();
        let metrics_dir = dir.path().join("metrics");
        let metrics = score(&processed, &model, &metrics_dir).unwrap();

        assert!(close(metrics["val_samples"], 4.0));
        assert!(close(metrics["accuracy"], 1.0));

        let written: Metrics =
            serde_json::from_str(&fs::read_to_string(metrics_dir.join(METRICS_FILE)).unwrap())
                .unwrap();
        assert_eq!(written, metrics);
    }
}
