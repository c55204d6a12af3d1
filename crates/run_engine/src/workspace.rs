//! Per-run output directories

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use contracts::{RunId, StageName};

/// `runs/run_<id>/{processed,model,metrics}` under the data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    pub root: PathBuf,
    pub processed: PathBuf,
    pub model: PathBuf,
    pub metrics: PathBuf,
}

impl RunWorkspace {
    /// Compute the layout without touching the filesystem
    pub fn for_run(data_root: &Path, run_id: RunId) -> Self {
        let root = data_root.join("runs").join(format!("run_{run_id}"));
        Self {
            processed: root.join("processed"),
            model: root.join("model"),
            metrics: root.join("metrics"),
            root,
        }
    }

    /// Compute the layout and create all directories
    pub fn create(data_root: &Path, run_id: RunId) -> io::Result<Self> {
        let ws = Self::for_run(data_root, run_id);
        for dir in [&ws.processed, &ws.model, &ws.metrics] {
            fs::create_dir_all(dir)?;
        }
        Ok(ws)
    }

    /// Output directory handed to a stage
    pub fn stage_dir(&self, stage: StageName) -> &Path {
        match stage {
            StageName::Prepare => &self.processed,
            StageName::Fit => &self.model,
            StageName::Score => &self.metrics,
        }
    }
}

/// Highest run id that already left `runs/run_<id>` or `logs/run_<id>.log`
/// under the data root
pub fn highest_used_run_id(data_root: &Path) -> io::Result<Option<RunId>> {
    let mut highest = None;
    for (dir, suffix) in [("runs", ""), ("logs", ".log")] {
        let entries = match fs::read_dir(data_root.join(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        for entry in entries {
            let name = entry?.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix("run_"))
                .and_then(|n| n.strip_suffix(suffix))
                .and_then(|n| n.parse::<u64>().ok());
            highest = highest.max(id);
        }
    }
    Ok(highest.map(RunId))
}
