//! Wires a loaded configuration to the native executor, the checker and the
//! stress runner.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    checker::{Checker, ExternalChecker, TokenChecker},
    config::{CheckerType, ConfigError, StressConfig},
    constants::TEMP_DIR_NAME,
    core::{
        domain::{ExecutionLimits, StressReport},
        error::StressError,
        pipeline::{
            persisting::FailedTestStore,
            preparing::{PreparedArtifacts, prepare_artifacts},
            round::RoundContext,
            stress::StressRunner,
        },
        traits::executor::Executor,
    },
    native::{executor::NativeExecutor, generator::ExecutorGenerator},
};

/// Prepares every program of the problem and runs the configured number of rounds.
///
/// Compiled binaries and checker scratch files live in `work_dir`. Without one,
/// a fresh directory under the system temp dir is used and removed afterwards.
#[tracing::instrument(skip(config), fields(problem = %config.problem_name))]
pub async fn run_stress(
    config: &StressConfig,
    problem_dir: &Path,
    work_dir: Option<&Path>,
) -> Result<StressReport, StressError> {
    let (work_dir, owned) = match work_dir {
        Some(dir) => (dir.to_path_buf(), false),
        None => (default_work_dir(&config.problem_name), true),
    };
    tracing::debug!("Using work dir {}", work_dir.display());

    let result = run_in(config, problem_dir, &work_dir).await;

    if owned {
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", work_dir.display(), e);
            }
        }
    }

    result
}

async fn run_in(
    config: &StressConfig,
    problem_dir: &Path,
    work_dir: &Path,
) -> Result<StressReport, StressError> {
    let (compiler, compiler_args) = config.compiler_command();
    let executor: Arc<dyn Executor> = Arc::new(NativeExecutor::new(
        work_dir.join("bin"),
        compiler,
        compiler_args,
    ));

    let prepared = prepare_artifacts(executor.as_ref(), problem_dir, config).await?;
    let context = build_context(config, problem_dir, work_dir, executor, prepared)?;

    StressRunner::new(
        config.problem_name.clone(),
        context,
        config.test_count,
        config.cpu_workers,
    )
    .run()
    .await
}

fn build_context(
    config: &StressConfig,
    problem_dir: &Path,
    work_dir: &Path,
    executor: Arc<dyn Executor>,
    prepared: PreparedArtifacts,
) -> Result<RoundContext, StressError> {
    let limits = ExecutionLimits {
        time: config.time_limit(),
    };

    let checker = match config.checker_type {
        CheckerType::Token => Checker::Token(TokenChecker::new()),
        CheckerType::External => {
            let artifact = prepared
                .checker
                .ok_or(ConfigError::MissingField("external_checker"))?;
            let checker = ExternalChecker::new(&artifact.path, config.checker_timeout())
                .map_err(StressError::CheckerSetup)?
                .with_work_dir(work_dir.join("checker"));
            Checker::External(checker)
        }
    };

    let (_, testgen_args) = config.testgen_command();
    let mut generator = ExecutorGenerator::new(
        executor.clone(),
        prepared.generator,
        testgen_args,
        limits.clone(),
    );
    if config.testgen_seed {
        generator = generator.with_seed_salt(seed_salt());
    }

    let failed_tests = config
        .failed_test_data
        .then(|| FailedTestStore::new(problem_dir.join(&config.failed_test_dir)));

    Ok(RoundContext {
        generator: Arc::new(generator),
        executor,
        checker: Arc::new(checker),
        main: prepared.main,
        others: prepared.others,
        limits,
        failed_tests,
    })
}

fn default_work_dir(problem_name: &str) -> PathBuf {
    std::env::temp_dir().join(TEMP_DIR_NAME).join(format!(
        "{}-{}",
        crate::files::sanitize_component(problem_name),
        uuid::Uuid::new_v4()
    ))
}

/// Differs between runs so consecutive runs explore different tests.
fn seed_salt() -> String {
    chrono::Utc::now().format("%H%M%S").to_string()
}
