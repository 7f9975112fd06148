//! Output verification.
//!
//! A [`Checker`] is a closed set of strategies. Adding a new kind of checker
//! means adding a variant here and matching on it in [`Checker::check`].

use std::path::PathBuf;

use crate::core::domain::CheckerResult;

pub mod external;
pub mod temp_files;
pub mod token;

pub use external::ExternalChecker;
pub use token::TokenChecker;

#[derive(Debug)]
pub enum Checker {
    Token(TokenChecker),
    External(ExternalChecker),
}

impl Checker {
    pub fn name(&self) -> &'static str {
        match self {
            Checker::Token(_) => "token",
            Checker::External(_) => "external",
        }
    }

    /// Judges `output` against the reference `answer` for the given `input`.
    ///
    /// A wrong answer is a regular [`CheckerResult`]; `Err` means the checker
    /// itself could not produce a verdict and the run must stop.
    pub async fn check(
        &self,
        input: &[u8],
        answer: &[u8],
        output: &[u8],
    ) -> Result<CheckerResult, CheckerError> {
        match self {
            Checker::Token(checker) => Ok(checker.check(answer, output)),
            Checker::External(checker) => checker.check(input, answer, output).await,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    #[error("external checker {} isn't executable", .path.display())]
    NotExecutable { path: PathBuf },
    #[error("{message}")]
    Malfunction { message: String },
    #[error("external checker timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
    #[error("external checker i/o error: {0}")]
    Io(#[from] std::io::Error),
}
