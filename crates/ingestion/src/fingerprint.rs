//! Content fingerprint and the registration payload built from it

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;

use contracts::{DatasetMeta, DatasetRegistration};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Read size for hashing
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Metadata tag for watcher-registered datasets
pub const META_SOURCE: &str = "nas_watcher";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub size_bytes: u64,
    /// Modification time, whole unix seconds
    pub mtime: i64,
    /// Lowercase hex SHA-256 of the full content
    pub sha256: String,
}

/// Stat and hash `path`. Blocking; run it off the async workers.
pub fn fingerprint(path: &Path) -> std::io::Result<Fingerprint> {
    let meta = std::fs::metadata(path)?;
    let mtime = match meta.modified()?.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    Ok(Fingerprint {
        size_bytes: meta.len(),
        mtime,
        sha256: sha256_file(path)?,
    })
}

pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Registration body for a settled file: named after the file stem, with the
/// fingerprint under `meta`
pub fn registration_for(path: &Path, fp: &Fingerprint) -> DatasetRegistration {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());
    let source_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut meta = DatasetMeta::new();
    meta.insert("source".into(), json!(META_SOURCE));
    meta.insert("file_name".into(), json!(file_name));
    meta.insert("size_bytes".into(), json!(fp.size_bytes));
    meta.insert("mtime".into(), json!(fp.mtime));
    meta.insert("sha256".into(), json!(fp.sha256));

    DatasetRegistration {
        name,
        source_path: source_path.display().to_string(),
        meta,
    }
}
