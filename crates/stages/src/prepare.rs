//! prepare: sort by `time`, fill gaps, write `processed.csv`

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use contracts::{StageError, StageResult};
use tracing::debug;

use crate::table::{numeric, Table};

pub const PROCESSED_FILE: &str = "processed.csv";
pub const TIME_COLUMN: &str = "time";

pub fn prepare(source: &Path, out_dir: &Path) -> StageResult<PathBuf> {
    let is_csv = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(StageError::unsupported(
            source,
            "the baseline stages only read CSV input",
        ));
    }

    std::fs::create_dir_all(out_dir)?;
    let mut table = Table::read(source)?;
    if let Some(col) = table.column(TIME_COLUMN) {
        sort_by_column(&mut table, col);
    }
    fill_missing(&mut table);

    let out = out_dir.join(PROCESSED_FILE);
    table.write(&out)?;
    debug!(rows = table.len(), path = %out.display(), "processed data written");
    Ok(out)
}

/// Stable sort; numeric when every non-empty cell parses, lexical otherwise.
/// Empty cells sort last.
fn sort_by_column(table: &mut Table, col: usize) {
    let all_numeric = table
        .rows
        .iter()
        .map(|r| r[col].as_str())
        .filter(|c| !c.is_empty())
        .all(|c| numeric(c).is_some());

    table.rows.sort_by(|a, b| {
        let (a, b) = (a[col].as_str(), b[col].as_str());
        match (a.is_empty(), b.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if all_numeric => {
                let (x, y) = (numeric(a).unwrap_or(0.0), numeric(b).unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (false, false) => a.cmp(b),
        }
    });
}

/// Forward fill, then backward fill, per column
fn fill_missing(table: &mut Table) {
    for col in 0..table.headers.len() {
        let mut last: Option<String> = None;
        for row in table.rows.iter_mut() {
            if row[col].is_empty() {
                if let Some(v) = &last {
                    row[col] = v.clone();
                }
            } else {
                last = Some(row[col].clone());
            }
        }
        let mut next: Option<String> = None;
        for row in table.rows.iter_mut().rev() {
            if row[col].is_empty() {
                if let Some(v) = &next {
                    row[col] = v.clone();
                }
            } else {
                next = Some(row[col].clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sorts_and_fills() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.csv");
        fs::write(&src, "time,x,label\n10,,b\n2,1.5,a\n9,,\n").unwrap();

        let out = prepare(&src, &dir.path().join("processed")).unwrap();
        assert_eq!(out.file_name().unwrap(), PROCESSED_FILE);

        let table = Table::read(&out).unwrap();
        let times: Vec<_> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(times, ["2", "9", "10"]);
        // x forward-filled from the first row
        assert!(table.rows.iter().all(|r| r[1] == "1.5"));
        // label: "a", forward-fill -> "a", "b"
        let labels: Vec<_> = table.rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(labels, ["a", "a", "b"]);
    }

    #[test]
    fn test_backward_fill_leading_gap() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.csv");
        fs::write(&src, "x,y\n,1\n,2\n3,4\n").unwrap();

        let out = prepare(&src, dir.path()).unwrap();
        let table = Table::read(&out).unwrap();
        assert!(table.rows.iter().all(|r| r[0] == "3"));
    }

    #[test]
    fn test_without_time_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.csv");
        fs::write(&src, "x\n3\n1\n2\n").unwrap();

        let out = prepare(&src, dir.path()).unwrap();
        let table = Table::read(&out).unwrap();
        let xs: Vec<_> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(xs, ["3", "1", "2"]);
    }

    #[test]
    fn test_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.csv");
        fs::write(&src, "time,x\nb,1\na,\nc,3\n").unwrap();

        let first = fs::read(prepare(&src, &dir.path().join("a")).unwrap()).unwrap();
        let second = fs::read(prepare(&src, &dir.path().join("b")).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_csv_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.parquet");
        fs::write(&src, b"PAR1").unwrap();
        let err = prepare(&src, dir.path()).unwrap_err();
        assert!(matches!(err, StageError::Unsupported { .. }));
    }
}
