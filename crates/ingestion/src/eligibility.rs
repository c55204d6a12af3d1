//! Which paths the watcher considers, and sentinel file naming

use std::path::{Path, PathBuf};

use contracts::WatcherConfig;

/// Sentinel suffix: `sample.csv` is released by `sample.csv.done`
pub const SENTINEL_SUFFIX: &str = ".done";

/// Name-based filter built once from the watcher configuration.
///
/// Never touches the filesystem; the regular-file check happens in the
/// candidate's stability wait.
#[derive(Debug, Clone)]
pub struct Eligibility {
    include_ext: Vec<String>,
    ignore_suffixes: Vec<String>,
}

impl Eligibility {
    pub fn new(config: &WatcherConfig) -> Self {
        Self {
            include_ext: config.include_ext.iter().map(|e| e.to_lowercase()).collect(),
            ignore_suffixes: config
                .ignore_suffixes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    /// Name checks only; the file does not have to exist
    pub fn accepts_name(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        if name.ends_with(SENTINEL_SUFFIX) {
            return false;
        }
        if self.ignore_suffixes.iter().any(|s| name.ends_with(s.as_str())) {
            return false;
        }
        if self.include_ext.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = format!(".{}", ext.to_lowercase());
                self.include_ext.contains(&ext)
            }
            None => false,
        }
    }
}

/// `<file><ext>.done` next to `path`
pub fn sentinel_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(SENTINEL_SUFFIX);
    path.with_file_name(name)
}

pub fn is_sentinel(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_lowercase().ends_with(SENTINEL_SUFFIX))
}

/// Data file a sentinel releases
pub fn companion_of(sentinel: &Path) -> Option<PathBuf> {
    let name = sentinel.file_name()?.to_str()?;
    let stem_len = name.len().checked_sub(SENTINEL_SUFFIX.len())?;
    let tail = name.get(stem_len..)?;
    if stem_len == 0 || !tail.eq_ignore_ascii_case(SENTINEL_SUFFIX) {
        return None;
    }
    Some(sentinel.with_file_name(&name[..stem_len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eligibility() -> Eligibility {
        Eligibility::new(&WatcherConfig::default())
    }

    #[test]
    fn test_accepts_name() {
        let e = eligibility();
        assert!(e.accepts_name(Path::new("/in/sample.csv")));
        assert!(e.accepts_name(Path::new("/in/SAMPLE.CSV")));
        assert!(e.accepts_name(Path::new("/in/data.parquet")));
        assert!(!e.accepts_name(Path::new("/in/sample.csv.done")));
        assert!(!e.accepts_name(Path::new("/in/sample.csv.tmp")));
        assert!(!e.accepts_name(Path::new("/in/upload.PARTIAL")));
        assert!(!e.accepts_name(Path::new("/in/notes.txt")));
        assert!(!e.accepts_name(Path::new("/in/README")));
    }

    #[test]
    fn test_empty_allow_list_accepts_any_extension() {
        let config = WatcherConfig {
            include_ext: Vec::new(),
            ..WatcherConfig::default()
        };
        let e = Eligibility::new(&config);
        assert!(e.accepts_name(Path::new("/in/notes.txt")));
        assert!(e.accepts_name(Path::new("/in/README")));
        assert!(!e.accepts_name(Path::new("/in/x.tmp")));
    }

    #[test]
    fn test_sentinel_naming() {
        let data = Path::new("/in/sample.csv");
        let sentinel = sentinel_for(data);
        assert_eq!(sentinel, Path::new("/in/sample.csv.done"));
        assert!(is_sentinel(&sentinel));
        assert!(!is_sentinel(data));
        assert_eq!(companion_of(&sentinel).unwrap(), data);
        assert_eq!(
            companion_of(Path::new("/in/x.csv.DONE")).unwrap(),
            Path::new("/in/x.csv")
        );
        assert!(companion_of(Path::new("/in/.done")).is_none());
        assert!(companion_of(data).is_none());
    }
}
