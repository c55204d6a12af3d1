//! Stability wait: a file is settled once its size has not changed for a
//! cumulative window.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tracing::trace;

/// Poll the size of `path` every `poll` until it has been unchanged for
/// `window`.
///
/// Returns `Ok(None)` when the path disappears or is not a regular file;
/// the caller abandons it.
pub async fn wait_until_stable(
    path: &Path,
    window: Duration,
    poll: Duration,
) -> std::io::Result<Option<u64>> {
    let Some(mut last_size) = current_size(path).await? else {
        return Ok(None);
    };

    let mut stable_for = Duration::ZERO;
    while stable_for < window {
        tokio::time::sleep(poll).await;
        let Some(size) = current_size(path).await? else {
            return Ok(None);
        };
        if size == last_size {
            stable_for += poll;
        } else {
            trace!(path = %path.display(), last_size, size, "size changed, restarting window");
            last_size = size;
            stable_for = Duration::ZERO;
        }
    }
    Ok(Some(last_size))
}

async fn current_size(path: &Path) -> std::io::Result<Option<u64>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use std::time::Instant;

    #[tokio::test]
    async fn test_stable_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.csv");
        fs::write(&p, "abc").unwrap();

        let size = wait_until_stable(&p, Duration::from_millis(60), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(size, Some(3));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let size = wait_until_stable(
            &dir.path().join("nope.csv"),
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_directory_never_settles() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("folder.csv");
        fs::create_dir(&p).unwrap();

        let size = wait_until_stable(&p, Duration::from_millis(60), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_vanishes_during_wait() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.csv");
        fs::write(&p, "abc").unwrap();

        let remover = {
            let p = p.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                fs::remove_file(&p).unwrap();
            })
        };
        let size = wait_until_stable(&p, Duration::from_secs(5), Duration::from_millis(20))
            .await
            .unwrap();
        remover.await.unwrap();
        assert_eq!(size, None);
    }

    #[tokio::test]
    async fn test_growth_restarts_window() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.csv");
        fs::write(&p, "a").unwrap();

        let writer = {
            let p = p.clone();
            tokio::spawn(async move {
                for _ in 0..4 {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    let mut f = fs::OpenOptions::new().append(true).open(&p).unwrap();
                    f.write_all(b"b").unwrap();
                }
            })
        };

        let started = Instant::now();
        let size = wait_until_stable(&p, Duration::from_millis(100), Duration::from_millis(20))
            .await
            .unwrap();
        writer.await.unwrap();

        assert_eq!(size, Some(5));
        // last append lands around 160ms, then a full quiet window is needed
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
