use std::path::{Path, PathBuf};

use futures::future::try_join_all;

use crate::{
    config::{CheckerType, StressConfig},
    constants::SOURCE_EXTENSIONS,
    core::{
        domain::{Artifact, CompilationLimits},
        traits::executor::{CompileError, Executor},
    },
    files::{is_executable, is_source},
};

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error("{name}: no such file in {}", .dir.display())]
    NotFound { name: String, dir: PathBuf },
    #[error("{name} ({}) isn't executable", .path.display())]
    NotExecutable { name: String, path: PathBuf },
    #[error("failed to compile {name}: {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },
}

/// Everything a run executes, ready to be spawned.
#[derive(Debug, Clone)]
pub struct PreparedArtifacts {
    pub main: Artifact,
    pub others: Vec<Artifact>,
    pub generator: Artifact,
    /// Located (and compiled if needed) but not yet checked for the execute bit.
    pub checker: Option<Artifact>,
}

/// Compiles sources and resolves prebuilt executables, all concurrently.
#[tracing::instrument(skip_all, fields(problem = %config.problem_name))]
pub async fn prepare_artifacts(
    executor: &dyn Executor,
    problem_dir: &Path,
    config: &StressConfig,
) -> Result<PreparedArtifacts, PrepareError> {
    let limits = CompilationLimits {
        time: config.compilation_time_limit(),
    };
    let (generator, _) = config.testgen_command();

    let checker = async {
        match (&config.checker_type, &config.external_checker) {
            (CheckerType::External, Some(name)) => {
                prepare_one(executor, problem_dir, name, &limits, false)
                    .await
                    .map(Some)
            }
            _ => Ok(None),
        }
    };

    let (main, others, generator, checker) = tokio::try_join!(
        prepare_one(
            executor,
            problem_dir,
            &config.main_correct_solution,
            &limits,
            true
        ),
        try_join_all(
            config
                .other_solutions
                .iter()
                .map(|name| prepare_one(executor, problem_dir, name, &limits, true))
        ),
        prepare_one(executor, problem_dir, &generator, &limits, true),
        checker,
    )?;

    tracing::info!(
        "Prepared {} solution(s), generator and {} checker",
        others.len() + 1,
        config.checker_type.as_str()
    );

    Ok(PreparedArtifacts {
        main,
        others,
        generator,
        checker,
    })
}

async fn prepare_one(
    executor: &dyn Executor,
    problem_dir: &Path,
    name: &str,
    limits: &CompilationLimits,
    require_executable: bool,
) -> Result<Artifact, PrepareError> {
    let path = locate(problem_dir, name).ok_or_else(|| PrepareError::NotFound {
        name: name.to_string(),
        dir: problem_dir.into(),
    })?;

    if is_source(&path) {
        tracing::info!("Compiling {}", name);
        let compiled = executor
            .compile(&path, limits)
            .await
            .map_err(|source| PrepareError::Compile {
                name: name.to_string(),
                source,
            })?;
        return Ok(Artifact {
            name: name.to_string(),
            path: compiled.path,
        });
    }

    if require_executable && !is_executable(&path) {
        return Err(PrepareError::NotExecutable {
            name: name.to_string(),
            path,
        });
    }

    Ok(Artifact {
        name: name.to_string(),
        path,
    })
}

/// Finds `name` in the problem directory. A name without an extension also
/// matches a source file with that stem, so `testgen` finds `testgen.cpp`.
fn locate(problem_dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = problem_dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    if direct.extension().is_some() {
        return None;
    }

    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| direct.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
