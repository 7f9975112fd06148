//! Stress run configuration.
//!
//! The configuration is a JSON document loaded once before the run. Every field
//! is checked here, so a bad value never surfaces in the middle of a run.

use std::{
    collections::HashSet,
    path::{Component, Path},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHECKER_TIMEOUT_SECS, DEFAULT_COMPILATION_TIME_LIMIT_SECS, DEFAULT_FAILED_TEST_DIR,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckerType {
    Token,
    External,
}

impl CheckerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckerType::Token => "token",
            CheckerType::External => "external",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StressConfig {
    pub problem_name: String,
    pub main_correct_solution: String,
    #[serde(default)]
    pub other_solutions: Vec<String>,
    pub checker_type: CheckerType,
    #[serde(default)]
    pub external_checker: Option<String>,
    /// Seconds.
    #[serde(default = "default_checker_timeout")]
    pub checker_timeout: f64,
    pub testgen_script: String,
    #[serde(default = "default_true")]
    pub testgen_seed: bool,
    /// Seconds, wall clock, per solution or generator run.
    pub time_limit: f64,
    pub test_count: u32,
    #[serde(default)]
    pub failed_test_data: bool,
    #[serde(default = "default_failed_test_dir")]
    pub failed_test_dir: String,
    pub cpu_workers: usize,
    #[serde(default)]
    pub compilation_command: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
    #[serde(default)]
    pub compiler_args: Vec<String>,
    /// Seconds.
    #[serde(default = "default_compilation_time_limit")]
    pub compilation_time_limit: f64,
}

fn default_true() -> bool {
    true
}

fn default_checker_timeout() -> f64 {
    DEFAULT_CHECKER_TIMEOUT_SECS
}

fn default_compilation_time_limit() -> f64 {
    DEFAULT_COMPILATION_TIME_LIMIT_SECS
}

fn default_failed_test_dir() -> String {
    DEFAULT_FAILED_TEST_DIR.to_string()
}

impl StressConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: StressConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the round count and worker count, re-validating the result.
    pub fn with_overrides(
        mut self,
        test_count: Option<u32>,
        cpu_workers: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(test_count) = test_count {
            self.test_count = test_count;
        }
        if let Some(cpu_workers) = cpu_workers {
            self.cpu_workers = cpu_workers;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("problem_name", &self.problem_name)?;
        non_empty("main_correct_solution", &self.main_correct_solution)?;
        non_empty("testgen_script", &self.testgen_script)?;
        non_empty("failed_test_dir", &self.failed_test_dir)?;
        nested_relative("failed_test_dir", &self.failed_test_dir)?;

        let mut seen = HashSet::from([self.main_correct_solution.as_str()]);
        for solution in &self.other_solutions {
            non_empty("other_solutions", solution)?;
            if !seen.insert(solution.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "other_solutions",
                    reason: format!("{} is listed more than once", solution),
                });
            }
        }

        if self.checker_type == CheckerType::External {
            match &self.external_checker {
                Some(path) => non_empty("external_checker", path)?,
                None => return Err(ConfigError::MissingField("external_checker")),
            }
        }

        positive_seconds("time_limit", self.time_limit)?;
        positive_seconds("checker_timeout", self.checker_timeout)?;
        positive_seconds("compilation_time_limit", self.compilation_time_limit)?;

        if self.test_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "test_count",
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.cpu_workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cpu_workers",
                reason: "must be a positive integer".to_string(),
            });
        }

        match (&self.compilation_command, &self.compiler) {
            (Some(command), None) => {
                non_empty("compilation_command", command)?;
                if !self.compiler_args.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "compiler_args",
                        reason: "only allowed together with `compiler`".to_string(),
                    });
                }
            }
            (None, Some(compiler)) => non_empty("compiler", compiler)?,
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: "compilation_command",
                    reason: "set either `compilation_command` or `compiler`, not both".to_string(),
                });
            }
            (None, None) => return Err(ConfigError::MissingField("compilation_command")),
        }

        Ok(())
    }

    /// The compiler program and the arguments placed before the source file.
    pub fn compiler_command(&self) -> (String, Vec<String>) {
        match (&self.compilation_command, &self.compiler) {
            (Some(command), _) => {
                let mut parts = command.split_whitespace().map(str::to_string);
                let program = parts.next().unwrap_or_default();
                (program, parts.collect())
            }
            (None, Some(compiler)) => (compiler.clone(), self.compiler_args.clone()),
            (None, None) => (String::new(), Vec::new()),
        }
    }

    /// The generator program and its arguments.
    pub fn testgen_command(&self) -> (String, Vec<String>) {
        let mut parts = self.testgen_script.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        (program, parts.collect())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.time_limit)
    }

    pub fn checker_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.checker_timeout)
    }

    pub fn compilation_time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.compilation_time_limit)
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// The directory is emptied on every run, so it must stay strictly inside the
/// problem directory.
fn nested_relative(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let plain = Path::new(value)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !plain {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!(
                "{} must be a relative path below the problem directory without `.` or `..`",
                value
            ),
        });
    }
    Ok(())
}

fn positive_seconds(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // Upper bound keeps Duration::from_secs_f64 from panicking.
    if !value.is_finite() || value <= 0.0 || value > 1e9 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("{} is not a positive number of seconds", value),
        });
    }
    Ok(())
}
