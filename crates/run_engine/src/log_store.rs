//! Per-run text logs
//!
//! One append-only file per run at `<data_root>/logs/run_<id>.log`. Each
//! append is one `[<rfc3339 utc>] <message>` line.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use contracts::RunId;

/// Default number of lines returned by a tail request
pub const DEFAULT_TAIL_LINES: usize = 200;
/// Smallest tail a boundary caller may request
pub const MIN_TAIL_LINES: usize = 10;
/// Largest tail a boundary caller may request
pub const MAX_TAIL_LINES: usize = 5000;

/// Clamp a caller-supplied line count to `[MIN_TAIL_LINES, MAX_TAIL_LINES]`
pub fn clamp_tail_lines(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_TAIL_LINES)
        .clamp(MIN_TAIL_LINES, MAX_TAIL_LINES)
}

/// Log store rooted at a `logs/` directory
#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    /// Log store under `<data_root>/logs`
    pub fn new(data_root: &Path) -> Self {
        Self {
            dir: data_root.join("logs"),
        }
    }

    /// Log file path for a run
    pub fn path(&self, run_id: RunId) -> PathBuf {
        self.dir.join(format!("run_{run_id}.log"))
    }

    /// Append one line, creating the directory and file on first write
    pub fn append(&self, run_id: RunId, message: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let line = format!("[{stamp}] {}\n", escape_newlines(message));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(run_id))?;
        file.write_all(line.as_bytes())
    }

    /// Last `lines` raw lines joined by `\n`; empty when the run has no log
    pub fn tail(&self, run_id: RunId, lines: usize) -> io::Result<String> {
        Ok(self.tail_lines(run_id, lines)?.join("\n"))
    }

    /// Like [`RunLog::tail`] but with the timestamp prefix stripped
    pub fn tail_messages(&self, run_id: RunId, lines: usize) -> io::Result<Vec<String>> {
        Ok(self
            .tail_lines(run_id, lines)?
            .into_iter()
            .map(|line| strip_timestamp(&line).to_string())
            .collect())
    }

    fn tail_lines(&self, run_id: RunId, lines: usize) -> io::Result<Vec<String>> {
        let content = match fs::read_to_string(self.path(run_id)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|s| s.to_string()).collect())
    }
}

fn escape_newlines(message: &str) -> String {
    message.replace('\r', "\\r").replace('\n', "\\n")
}

fn strip_timestamp(line: &str) -> &str {
    if line.starts_with('[') {
        if let Some(end) = line.find("] ") {
            return &line[end + 2..];
        }
    }
    line
}
