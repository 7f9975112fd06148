use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::fs;

use crate::{core::domain::Verdict, files::sanitize_component};

const ROUND_PREFIX: &str = "round_";

/// Keeps the input, answer and output of every round that did not pass.
///
/// Each failure gets its own directory `round_<n>_<solution>` so concurrent
/// rounds never write to the same place.
#[derive(Debug, Clone)]
pub struct FailedTestStore {
    dir: PathBuf,
}

impl FailedTestStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Removes the `round_*` directories of earlier runs. Anything else in the
    /// directory is left alone.
    pub async fn reset(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let owned = entry.file_name().to_string_lossy().starts_with(ROUND_PREFIX)
                && entry.file_type().await?.is_dir();
            if owned {
                fs::remove_dir_all(entry.path()).await?;
            }
        }
        Ok(())
    }

    pub async fn save_failure(
        &self,
        verdict: &Verdict,
        input: &[u8],
        answer: &[u8],
        output: &[u8],
    ) -> io::Result<PathBuf> {
        let dir = self.dir.join(format!(
            "{}{:04}_{}",
            ROUND_PREFIX,
            verdict.round,
            sanitize_component(&verdict.solution)
        ));
        fs::create_dir_all(&dir).await?;

        fs::write(dir.join("input.txt"), input).await?;
        fs::write(dir.join("answer.txt"), answer).await?;
        fs::write(dir.join("output.txt"), output).await?;
        fs::write(
            dir.join("verdict.txt"),
            format!(
                "solution: {}\nround: {}\nstatus: {}\n\n{}",
                verdict.solution, verdict.round, verdict.result.status, verdict.result.message
            ),
        )
        .await?;

        Ok(dir)
    }

    /// Saves the input of a round whose main solution failed, returning the file path.
    pub async fn save_inconclusive(&self, round: u32, input: &[u8]) -> io::Result<PathBuf> {
        let dir = self
            .dir
            .join(format!("{}{:04}_inconclusive", ROUND_PREFIX, round));
        fs::create_dir_all(&dir).await?;

        let path = dir.join("input.txt");
        fs::write(&path, input).await?;
        Ok(path)
    }
}
