use std::{path::PathBuf, sync::Arc};

use crate::{
    checker::Checker,
    core::{
        domain::{Artifact, CheckerResult, ContestantExecutionStatus, ExecutionLimits, Verdict},
        error::StressError,
        pipeline::persisting::FailedTestStore,
        traits::{
            executor::{Executor, RunError},
            generator::TestGenerator,
        },
    },
};

/// Everything a round needs. Shared read-only by all workers.
#[derive(Debug)]
pub struct RoundContext {
    pub generator: Arc<dyn TestGenerator>,
    pub executor: Arc<dyn Executor>,
    pub checker: Arc<Checker>,
    pub main: Artifact,
    pub others: Vec<Artifact>,
    pub limits: ExecutionLimits,
    pub failed_tests: Option<FailedTestStore>,
}

#[derive(Debug)]
pub struct RoundOutcome {
    pub round: u32,
    pub verdicts: Vec<Verdict>,
    pub failed_tests: Vec<PathBuf>,
}

/// Generates one input, obtains the reference answer and judges every
/// alternate solution against it.
///
/// Alternate solutions that crash or run out of time get a verdict. Failures of
/// the generator, the main solution or the checker end the whole run.
#[tracing::instrument(skip(ctx))]
pub async fn run_round(ctx: &RoundContext, round: u32) -> Result<RoundOutcome, StressError> {
    let input = ctx
        .generator
        .generate(round)
        .await
        .map_err(|source| StressError::Generation { round, source })?;

    let answer = match ctx.executor.run(&ctx.main, &[], &input, &ctx.limits).await {
        Ok(result) => result.stdout,
        Err(error) => return Err(inconclusive(ctx, round, &input, error).await),
    };

    let mut outcome = RoundOutcome {
        round,
        verdicts: Vec::with_capacity(ctx.others.len()),
        failed_tests: Vec::new(),
    };

    for solution in &ctx.others {
        let (result, output) = match ctx.executor.run(solution, &[], &input, &ctx.limits).await {
            Ok(run) => {
                let result = ctx
                    .checker
                    .check(&input, &answer, &run.stdout)
                    .await
                    .map_err(|source| StressError::Checker { round, source })?;
                (result, run.stdout)
            }
            Err(RunError::TimeLimitExceeded { execution_time_ms }) => (
                CheckerResult::new(
                    ContestantExecutionStatus::TimeLimitExceeded,
                    format!("time limit exceeded after {} ms", execution_time_ms),
                ),
                Vec::new(),
            ),
            Err(RunError::Crash { result }) => (
                CheckerResult::new(
                    ContestantExecutionStatus::RuntimeError,
                    format!(
                        "exited with status {}: {}",
                        result.status,
                        String::from_utf8_lossy(&result.stderr)
                    ),
                ),
                result.stdout,
            ),
            Err(RunError::Internal { msg }) => {
                return Err(StressError::Execution {
                    round,
                    solution: solution.name.clone(),
                    msg,
                });
            }
        };

        let verdict = Verdict {
            round,
            solution: solution.name.clone(),
            result,
        };

        if verdict.result.status.is_ok() {
            tracing::debug!("{}: {}", verdict.solution, verdict.result.status);
        } else {
            tracing::warn!(
                "Round {}: {} got {}: {}",
                round,
                verdict.solution,
                verdict.result.status,
                verdict.result.message.trim()
            );
            if let Some(store) = &ctx.failed_tests {
                let dir = store
                    .save_failure(&verdict, &input, &answer, &output)
                    .await
                    .map_err(StressError::Persistence)?;
                outcome.failed_tests.push(dir);
            }
        }

        outcome.verdicts.push(verdict);
    }

    Ok(outcome)
}

async fn inconclusive(
    ctx: &RoundContext,
    round: u32,
    input: &[u8],
    error: RunError,
) -> StressError {
    let reason = match &error {
        RunError::Crash { result } => format!(
            "{}: {}",
            error,
            String::from_utf8_lossy(&result.stderr).trim()
        ),
        _ => error.to_string(),
    };
    tracing::error!("Main solution failed in round {}: {}", round, reason);

    let input = match &ctx.failed_tests {
        Some(store) => match store.save_inconclusive(round, input).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to save input of round {}: {}", round, e);
                None
            }
        },
        None => None,
    };

    StressError::InconclusiveRound {
        round,
        reason,
        input,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        checker::{CheckerError, ExternalChecker, TokenChecker},
        core::traits::{
            executor::{MockExecutor, RunResult},
            generator::{GenerateError, MockTestGenerator},
        },
        test_utils::write_script,
    };

    fn artifact(name: &str) -> Artifact {
        Artifact {
            name: name.to_string(),
            path: PathBuf::from(format!("/solutions/{}", name)),
        }
    }

    fn ok_run(stdout: &[u8]) -> Result<RunResult, RunError> {
        Ok(RunResult {
            status: 0,
            stdout: stdout.to_vec(),
            stderr: vec![],
            execution_time_ms: 5,
        })
    }

    fn generator_returning(input: &'static [u8]) -> MockTestGenerator {
        let mut generator = MockTestGenerator::new();
        generator
            .expect_generate()
            .returning(move |_| Ok(input.to_vec()));
        generator
    }

    fn context(
        generator: MockTestGenerator,
        executor: MockExecutor,
        checker: Checker,
        failed_tests: Option<FailedTestStore>,
    ) -> RoundContext {
        RoundContext {
            generator: Arc::new(generator),
            executor: Arc::new(executor),
            checker: Arc::new(checker),
            main: artifact("main.cpp"),
            others: vec![artifact("fast.cpp"), artifact("slow.cpp")],
            limits: ExecutionLimits {
                time: Duration::from_secs(1),
            },
            failed_tests,
        }
    }

    #[tokio::test]
    async fn test_round_judges_every_alternate() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "main.cpp")
            .times(1)
            .returning(|_, _, _, _| ok_run(b"6\n"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "fast.cpp")
            .times(1)
            .returning(|_, _, _, _| ok_run(b"6"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "slow.cpp")
            .times(1)
            .returning(|_, _, _, _| ok_run(b"7"));

        let ctx = context(
            generator_returning(b"1 2 3"),
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        let outcome = run_round(&ctx, 4).await.unwrap();

        assert_eq!(outcome.round, 4);
        assert_eq!(outcome.verdicts.len(), 2);
        assert_eq!(outcome.verdicts[0].solution, "fast.cpp");
        assert_eq!(outcome.verdicts[0].result.status, ContestantExecutionStatus::Ok);
        assert_eq!(outcome.verdicts[1].solution, "slow.cpp");
        assert_eq!(
            outcome.verdicts[1].result.status,
            ContestantExecutionStatus::WrongAnswer
        );
        assert!(outcome.failed_tests.is_empty());
    }

    #[tokio::test]
    async fn test_alternates_receive_generated_input() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|_, args, stdin, _| args.is_empty() && stdin == b"5\n1 2 3 4 5")
            .times(3)
            .returning(|_, _, _, _| ok_run(b"15"));

        let ctx = context(
            generator_returning(b"5\n1 2 3 4 5"),
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        let outcome = run_round(&ctx, 0).await.unwrap();
        assert!(outcome.verdicts.iter().all(|v| v.result.status.is_ok()));
    }

    #[tokio::test]
    async fn test_alternate_timeout_and_crash_are_verdicts() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "main.cpp")
            .returning(|_, _, _, _| ok_run(b"6"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "fast.cpp")
            .return_const(Err(RunError::TimeLimitExceeded {
                execution_time_ms: 1001,
            }));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "slow.cpp")
            .return_const(Err(RunError::Crash {
                result: RunResult {
                    status: 134,
                    stdout: b"partial".to_vec(),
                    stderr: b"assertion failed".to_vec(),
                    execution_time_ms: 3,
                },
            }));

        let ctx = context(
            generator_returning(b"1 2 3"),
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        let outcome = run_round(&ctx, 0).await.unwrap();

        assert_eq!(
            outcome.verdicts[0].result.status,
            ContestantExecutionStatus::TimeLimitExceeded
        );
        assert_eq!(
            outcome.verdicts[1].result.status,
            ContestantExecutionStatus::RuntimeError
        );
        assert!(outcome.verdicts[1].result.message.contains("assertion failed"));
    }

    #[tokio::test]
    async fn test_main_timeout_makes_round_inconclusive() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "main.cpp")
            .times(1)
            .return_const(Err(RunError::TimeLimitExceeded {
                execution_time_ms: 1002,
            }));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name != "main.cpp")
            .times(0)
            .returning(|_, _, _, _| ok_run(b""));

        let ctx = context(
            generator_returning(b"1 2 3"),
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        let result = run_round(&ctx, 9).await;

        assert!(matches!(
            result,
            Err(StressError::InconclusiveRound { round: 9, input: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_inconclusive_round_saves_input() {
        let root = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .times(1)
            .return_const(Err(RunError::Crash {
                result: RunResult {
                    status: 139,
                    stdout: vec![],
                    stderr: b"Segmentation fault".to_vec(),
                    execution_time_ms: 3,
                },
            }));

        let ctx = context(
            generator_returning(b"10 20"),
            executor,
            Checker::Token(TokenChecker::new()),
            Some(FailedTestStore::new(root.path())),
        );

        match run_round(&ctx, 2).await {
            Err(StressError::InconclusiveRound {
                round,
                reason,
                input: Some(path),
            }) => {
                assert_eq!(round, 2);
                assert!(reason.contains("Segmentation fault"));
                assert_eq!(std::fs::read(path).unwrap(), b"10 20");
            }
            other => panic!("Expected inconclusive round, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generator_failure_is_fatal() {
        let mut generator = MockTestGenerator::new();
        generator
            .expect_generate()
            .return_const(Err(GenerateError::Crashed {
                status: 3,
                stderr: "Opt n is not set".to_string(),
            }));
        let mut executor = MockExecutor::new();
        executor.expect_run().times(0).returning(|_, _, _, _| ok_run(b""));

        let ctx = context(
            generator,
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        assert!(matches!(
            run_round(&ctx, 0).await,
            Err(StressError::Generation { round: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_internal_error_of_alternate_is_fatal() {
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "main.cpp")
            .returning(|_, _, _, _| ok_run(b"6"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "fast.cpp")
            .return_const(Err(RunError::Internal {
                msg: "Permission denied".to_string(),
            }));

        let ctx = context(
            generator_returning(b"1"),
            executor,
            Checker::Token(TokenChecker::new()),
            None,
        );

        assert!(matches!(
            run_round(&ctx, 1).await,
            Err(StressError::Execution { round: 1, solution, .. }) if solution == "fast.cpp"
        ));
    }

    #[tokio::test]
    async fn test_failed_verdicts_are_persisted() {
        let root = tempfile::tempdir().unwrap();
        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "main.cpp")
            .returning(|_, _, _, _| ok_run(b"6"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "fast.cpp")
            .returning(|_, _, _, _| ok_run(b"6"));
        executor
            .expect_run()
            .withf(|artifact, _, _, _| artifact.name == "slow.cpp")
            .returning(|_, _, _, _| ok_run(b"5"));

        let ctx = context(
            generator_returning(b"1 2 3"),
            executor,
            Checker::Token(TokenChecker::new()),
            Some(FailedTestStore::new(root.path())),
        );

        let outcome = run_round(&ctx, 7).await.unwrap();

        assert_eq!(outcome.failed_tests, vec![root.path().join("round_0007_slow.cpp")]);
        let dir = &outcome.failed_tests[0];
        assert_eq!(std::fs::read(dir.join("input.txt")).unwrap(), b"1 2 3");
        assert_eq!(std::fs::read(dir.join("answer.txt")).unwrap(), b"6");
        assert_eq!(std::fs::read(dir.join("output.txt")).unwrap(), b"5");
    }

    #[tokio::test]
    async fn test_checker_malfunction_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "checker.sh",
            "printf 'FAIL cannot read answer' >&2\nexit 3",
        );
        let checker = ExternalChecker::new(script, Duration::from_secs(5))
            .unwrap()
            .with_work_dir(dir.path().join("work"));

        let mut executor = MockExecutor::new();
        executor
            .expect_run()
            .returning(|_, _, _, _| ok_run(b"6"));

        let ctx = context(
            generator_returning(b"1 2 3"),
            executor,
            Checker::External(checker),
            None,
        );

        match run_round(&ctx, 5).await {
            Err(
                error @ StressError::Checker {
                    round: 5,
                    source: CheckerError::Malfunction { .. },
                },
            ) => {
                assert_eq!(error.to_string(), "FAIL cannot read answer");
            }
            other => panic!("Expected checker malfunction, got {:?}", other),
        }
        assert_eq!(
            std::fs::read_dir(dir.path().join("work")).unwrap().count(),
            0
        );
    }
}
