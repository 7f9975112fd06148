use std::time::Duration;

pub const TEMP_DIR_NAME: &str = "cp-stress";
pub const DEFAULT_CONFIG_FILE: &str = "stress.json";
pub const DEFAULT_FAILED_TEST_DIR: &str = "failed_tests";
pub const DEFAULT_CHECKER_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_COMPILATION_TIME_LIMIT_SECS: f64 = 60.0;

pub const SPAWN_ATTEMPTS: u32 = 50;
pub const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(10);

pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx"];

pub const EXIT_ALL_PASSED: u8 = 0;
pub const EXIT_VERDICTS_FAILED: u8 = 1;
pub const EXIT_FATAL: u8 = 2;
