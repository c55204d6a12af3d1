//! fit: train a baseline classifier on `processed.csv`
//!
//! The last 20% of rows (in processed order) are held out for scoring and
//! never seen by training. Variants:
//! - `baseline`: nearest standardized class centroid over numeric columns,
//!   majority class when there are no numeric columns
//! - `majority`: always predicts the most frequent training label

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use contracts::{StageError, StageResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{numeric, Table};

pub const MODEL_FILE: &str = "model.json";
pub const LABEL_COLUMN: &str = "label";
/// One row in `HOLDOUT_DIVISOR` (rounded up) is held out
pub const HOLDOUT_DIVISOR: usize = 5;

pub const VARIANT_BASELINE: &str = "baseline";
pub const VARIANT_MAJORITY: &str = "majority";

/// Serialized model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub variant: String,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    Majority {
        label: String,
    },
    Centroid {
        features: Vec<String>,
        means: Vec<f64>,
        scales: Vec<f64>,
        centroids: BTreeMap<String, Vec<f64>>,
    },
}

impl Model {
    /// Predict the label for one row of `table`
    pub fn predict(&self, table: &Table, row: &[String]) -> String {
        match self {
            Self::Majority { label } => label.clone(),
            Self::Centroid {
                features,
                means,
                scales,
                centroids,
            } => {
                let point: Vec<f64> = features
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        table
                            .column(name)
                            .and_then(|c| numeric(&row[c]))
                            .map(|v| (v - means[i]) / scales[i])
                            .unwrap_or(0.0)
                    })
                    .collect();

                let mut best: Option<(&String, f64)> = None;
                for (label, centroid) in centroids {
                    let dist: f64 = point
                        .iter()
                        .zip(centroid)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    if best.map_or(true, |(_, d)| dist < d) {
                        best = Some((label, dist));
                    }
                }
                best.map(|(l, _)| l.clone()).unwrap_or_default()
            }
        }
    }

    pub fn load(path: &Path) -> StageResult<ModelFile> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| StageError::other(format!("failed to read model {}", path.display()), e))
    }
}

/// Split `n` rows into (train, holdout) counts
pub fn split_counts(n: usize) -> Option<(usize, usize)> {
    if n < 2 {
        return None;
    }
    let holdout = n.div_ceil(HOLDOUT_DIVISOR);
    Some((n - holdout, holdout))
}

/// Label column index, or the error `fit` reports for it
pub fn label_column(table: &Table) -> StageResult<usize> {
    table.column(LABEL_COLUMN).ok_or_else(|| {
        StageError::invalid_input(format!(
            "processed data must contain '{LABEL_COLUMN}' column for training"
        ))
    })
}

pub fn fit(processed: &Path, out_dir: &Path, variant: &str) -> StageResult<PathBuf> {
    if variant != VARIANT_BASELINE && variant != VARIANT_MAJORITY {
        return Err(StageError::UnknownVariant(variant.to_string()));
    }

    let table = Table::read(processed)?;
    let label_col = label_column(&table)?;
    let (train_rows, holdout_rows) =
        split_counts(table.len()).ok_or_else(|| StageError::invalid_input("insufficient data"))?;
    let train = &table.rows[..train_rows];

    let model = if variant == VARIANT_MAJORITY {
        majority(train, label_col)
    } else {
        centroid(&table, train, label_col).unwrap_or_else(|| majority(train, label_col))
    };

    std::fs::create_dir_all(out_dir)?;
    let out = out_dir.join(MODEL_FILE);
    let file = ModelFile {
        variant: variant.to_string(),
        train_rows,
        holdout_rows,
        model,
    };
    let writer = BufWriter::new(File::create(&out)?);
    serde_json::to_writer_pretty(writer, &file)
        .map_err(|e| StageError::other("failed to write model", e))?;

    debug!(variant, train_rows, holdout_rows, path = %out.display(), "model written");
    Ok(out)
}

fn majority(train: &[Vec<String>], label_col: usize) -> Model {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in train {
        *counts.entry(row[label_col].as_str()).or_insert(0) += 1;
    }
    // ties go to the lexically smallest label
    let label = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        .map(|(l, _)| l.to_string())
        .unwrap_or_default();
    Model::Majority { label }
}

fn centroid(table: &Table, train: &[Vec<String>], label_col: usize) -> Option<Model> {
    let feature_cols: Vec<usize> = (0..table.headers.len())
        .filter(|&c| c != label_col)
        .filter(|&c| train.iter().all(|r| numeric(&r[c]).is_some()))
        .collect();
    if feature_cols.is_empty() {
        return None;
    }

    let n = train.len() as f64;
    let mut means = Vec::with_capacity(feature_cols.len());
    let mut scales = Vec::with_capacity(feature_cols.len());
    for &c in &feature_cols {
        let values: Vec<f64> = train.iter().filter_map(|r| numeric(&r[c])).collect();
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        means.push(mean);
        scales.push(if std > f64::EPSILON { std } else { 1.0 });
    }

    let mut sums: BTreeMap<String, (Vec<f64>, usize)> = BTreeMap::new();
    for row in train {
        let entry = sums
            .entry(row[label_col].clone())
            .or_insert_with(|| (vec![0.0; feature_cols.len()], 0));
        for (i, &c) in feature_cols.iter().enumerate() {
            let v = numeric(&row[c]).unwrap_or(means[i]);
            entry.0[i] += (v - means[i]) / scales[i];
        }
        entry.1 += 1;
    }
    let centroids = sums
        .into_iter()
        .map(|(label, (sum, count))| {
            let c = sum.into_iter().map(|s| s / count as f64).collect();
            (label, c)
        })
        .collect();

    Some(Model::Centroid {
        features: feature_cols
            .iter()
            .map(|&c| table.headers[c].clone())
            .collect(),
        means,
        scales,
        centroids,
    })
}
