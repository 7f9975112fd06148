use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

use serde::Serialize;

/// testlib exit codes understood by the harness.
pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const WRONG_ANSWER: i32 = 1;
    pub const PRESENTATION_ERROR: i32 = 2;
    pub const FAIL: i32 = 3;
    pub const DIRT: i32 = 4;
    pub const POINTS: i32 = 7;
    pub const UNEXPECTED_EOF: i32 = 8;
    pub const PARTIAL_BASE: i32 = 16;
    pub const PARTIAL_MAX: i32 = PARTIAL_BASE + 100;
}

/// Serialized as its display form so it can key a JSON map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum ContestantExecutionStatus {
    Ok,
    WrongAnswer,
    PresentationError,
    Fail,
    Dirt,
    Points,
    UnexpectedEof,
    Partial(u8),
    TimeLimitExceeded,
    RuntimeError,
}

impl ContestantExecutionStatus {
    /// Maps a checker exit code to a status. Codes outside the table are `Fail`.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            exit_codes::OK => Self::Ok,
            exit_codes::WRONG_ANSWER => Self::WrongAnswer,
            exit_codes::PRESENTATION_ERROR => Self::PresentationError,
            exit_codes::FAIL => Self::Fail,
            exit_codes::DIRT => Self::Dirt,
            exit_codes::POINTS => Self::Points,
            exit_codes::UNEXPECTED_EOF => Self::UnexpectedEof,
            exit_codes::PARTIAL_BASE..=exit_codes::PARTIAL_MAX => {
                Self::Partial((code - exit_codes::PARTIAL_BASE) as u8)
            }
            _ => Self::Fail,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ContestantExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::WrongAnswer => write!(f, "WRONG_ANSWER"),
            Self::PresentationError => write!(f, "PRESENTATION_ERROR"),
            Self::Fail => write!(f, "FAIL"),
            Self::Dirt => write!(f, "DIRT"),
            Self::Points => write!(f, "POINTS"),
            Self::UnexpectedEof => write!(f, "UNEXPECTED_EOF"),
            Self::Partial(points) => write!(f, "PARTIAL({})", points),
            Self::TimeLimitExceeded => write!(f, "TIME_LIMIT_EXCEEDED"),
            Self::RuntimeError => write!(f, "RUNTIME_ERROR"),
        }
    }
}

impl From<ContestantExecutionStatus> for String {
    fn from(status: ContestantExecutionStatus) -> Self {
        status.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckerResult {
    pub status: ContestantExecutionStatus,
    pub message: String,
}

impl CheckerResult {
    pub fn new(status: ContestantExecutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// A runnable executable, either compiled from a source file or used as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CompilationLimits {
    pub time: Duration,
}

#[derive(Clone, Debug)]
pub struct ExecutionLimits {
    pub time: Duration,
}

#[derive(Clone, Debug)]
pub enum CompilationLimitType {
    Time,
}

/// Verdict of one alternate solution in one round.
#[derive(Clone, Debug)]
pub struct Verdict {
    pub round: u32,
    pub solution: String,
    pub result: CheckerResult,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SolutionTally {
    pub total: u32,
    pub passed: u32,
    pub by_status: BTreeMap<ContestantExecutionStatus, u32>,
}

impl SolutionTally {
    pub fn record(&mut self, status: ContestantExecutionStatus) {
        self.total += 1;
        if status.is_ok() {
            self.passed += 1;
        }
        *self.by_status.entry(status).or_default() += 1;
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StressReport {
    pub problem_name: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub rounds_completed: u32,
    pub tallies: Vec<(String, SolutionTally)>,
    pub failed_tests: Vec<PathBuf>,
}

impl StressReport {
    pub fn all_passed(&self) -> bool {
        self.tallies.iter().all(|(_, tally)| tally.all_passed())
    }
}
