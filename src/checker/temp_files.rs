use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::fs;
use uuid::Uuid;

/// The three files an external checker reads during one call.
///
/// Paths are unique per instance. Every file is removed when the guard is
/// dropped, whichever way the owning call exits.
#[derive(Debug)]
pub struct TempArtifacts {
    pub input: PathBuf,
    pub output: PathBuf,
    pub answer: PathBuf,
}

impl TempArtifacts {
    pub async fn create(
        dir: &Path,
        input: &[u8],
        output: &[u8],
        answer: &[u8],
    ) -> io::Result<Self> {
        fs::create_dir_all(dir).await?;

        // The guard exists before the first write so a failed write still cleans up.
        let artifacts = Self {
            input: unique_path(dir),
            output: unique_path(dir),
            answer: unique_path(dir),
        };

        // Synchronous so no write can land after an aborted caller dropped the guard.
        std::fs::write(&artifacts.input, input)?;
        std::fs::write(&artifacts.output, output)?;
        std::fs::write(&artifacts.answer, answer)?;

        Ok(artifacts)
    }

    pub fn paths(&self) -> [&Path; 3] {
        [
            self.input.as_path(),
            self.output.as_path(),
            self.answer.as_path(),
        ]
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        for path in self.paths() {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

fn unique_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.txt", Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[tokio::test]
    async fn test_files_hold_buffers_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = TempArtifacts::create(dir.path(), b"in\n", b"out \x00", b"ans")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&artifacts.input).unwrap(), b"in\n");
        assert_eq!(std::fs::read(&artifacts.output).unwrap(), b"out \x00");
        assert_eq!(std::fs::read(&artifacts.answer).unwrap(), b"ans");
    }

    #[tokio::test]
    async fn test_drop_removes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = TempArtifacts::create(dir.path(), b"1", b"2", b"3")
            .await
            .unwrap();
        let paths: Vec<PathBuf> = artifacts.paths().iter().map(|p| p.to_path_buf()).collect();
        assert!(paths.iter().all(|p| p.exists()));

        drop(artifacts);

        assert!(paths.iter().all(|p| !p.exists()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_drop_tolerates_already_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = TempArtifacts::create(dir.path(), b"1", b"2", b"3")
            .await
            .unwrap();
        std::fs::remove_file(&artifacts.output).unwrap();

        drop(artifacts);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_aborted_callers_leave_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");

        for i in 0..2000 {
            let work = work.clone();
            let handle = tokio::spawn(async move {
                let _artifacts = TempArtifacts::create(&work, b"in", b"out", b"ans").await;
                std::future::pending::<()>().await;
            });
            for _ in 0..(i % 7) {
                tokio::task::yield_now().await;
            }
            handle.abort();
            let _ = handle.await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        let left = std::fs::read_dir(&work)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn test_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let mut guards = Vec::new();
        for _ in 0..50 {
            guards.push(
                TempArtifacts::create(dir.path(), b"", b"", b"")
                    .await
                    .unwrap(),
            );
        }

        let unique: HashSet<_> = guards.iter().flat_map(|g| g.paths()).collect();
        assert_eq!(unique.len(), 150);
    }
}
