use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use dashmap::DashMap;
use tokio::{sync::Mutex, task::JoinSet};

use crate::core::{
    domain::{SolutionTally, StressReport},
    error::StressError,
    pipeline::round::{RoundContext, run_round},
};

/// Drives `test_count` independent rounds on a pool of `cpu_workers` tasks.
#[derive(Debug)]
pub struct StressRunner {
    problem_name: String,
    context: Arc<RoundContext>,
    test_count: u32,
    cpu_workers: usize,
}

#[derive(Debug, Default)]
struct SharedState {
    next_round: AtomicU32,
    completed: AtomicU32,
    cancelled: AtomicBool,
    tallies: DashMap<String, SolutionTally>,
    failed_tests: Mutex<Vec<PathBuf>>,
}

impl StressRunner {
    pub fn new(
        problem_name: impl Into<String>,
        context: RoundContext,
        test_count: u32,
        cpu_workers: usize,
    ) -> Self {
        Self {
            problem_name: problem_name.into(),
            context: Arc::new(context),
            test_count,
            cpu_workers,
        }
    }

    /// Runs every round and returns the per-solution tally.
    ///
    /// The first fatal error cancels the remaining work: idle workers stop
    /// claiming rounds and in-flight rounds are aborted, which kills their
    /// child processes.
    #[tracing::instrument(skip(self), fields(problem = %self.problem_name))]
    pub async fn run(&self) -> Result<StressReport, StressError> {
        let started_at = chrono::Utc::now();

        if let Some(store) = &self.context.failed_tests {
            store.reset().await.map_err(StressError::Persistence)?;
            tracing::info!("Failed tests are saved to {}", store.dir().display());
        }

        let state = Arc::new(SharedState::default());
        for solution in &self.context.others {
            state
                .tallies
                .insert(solution.name.clone(), SolutionTally::default());
        }

        let workers = self.cpu_workers.min(self.test_count as usize).max(1);
        tracing::info!(
            "Running {} rounds on {} worker(s) with {} checker",
            self.test_count,
            workers,
            self.context.checker.name()
        );

        let mut join_set = JoinSet::new();
        for worker in 0..workers {
            join_set.spawn(work(
                worker,
                self.context.clone(),
                state.clone(),
                self.test_count,
            ));
        }

        let mut fatal = None;
        while let Some(joined) = join_set.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => Err(StressError::Worker(e.to_string())),
            };

            if let Err(error) = result {
                if fatal.is_none() {
                    state.cancelled.store(true, Ordering::SeqCst);
                    join_set.abort_all();
                    fatal = Some(error);
                }
            }
        }

        if let Some(error) = fatal {
            tracing::error!("Stress run aborted: {}", error);
            return Err(error);
        }

        let mut failed_tests = std::mem::take(&mut *state.failed_tests.lock().await);
        failed_tests.sort();

        let tallies = self
            .context
            .others
            .iter()
            .map(|solution| {
                let tally = state
                    .tallies
                    .get(&solution.name)
                    .map(|tally| tally.value().clone())
                    .unwrap_or_default();
                (solution.name.clone(), tally)
            })
            .collect();

        Ok(StressReport {
            problem_name: self.problem_name.clone(),
            started_at,
            finished_at: chrono::Utc::now(),
            rounds_completed: state.completed.load(Ordering::SeqCst),
            tallies,
            failed_tests,
        })
    }
}

async fn work(
    worker: usize,
    context: Arc<RoundContext>,
    state: Arc<SharedState>,
    test_count: u32,
) -> Result<(), StressError> {
    let progress_step = (test_count / 10).max(1);

    loop {
        if state.cancelled.load(Ordering::SeqCst) {
            tracing::debug!("Worker {} stops, run cancelled", worker);
            return Ok(());
        }

        let claimed = state.next_round.fetch_add(1, Ordering::SeqCst);
        if claimed >= test_count {
            return Ok(());
        }
        // Rounds are numbered from 1 in logs and saved directories.
        let round = claimed + 1;

        let outcome = match run_round(&context, round).await {
            Ok(outcome) => outcome,
            Err(error) => {
                state.cancelled.store(true, Ordering::SeqCst);
                return Err(error);
            }
        };

        tracing::debug!(
            "Round {} judged {} solution(s)",
            outcome.round,
            outcome.verdicts.len()
        );
        for verdict in &outcome.verdicts {
            state
                .tallies
                .entry(verdict.solution.clone())
                .or_default()
                .record(verdict.result.status);
        }
        state
            .failed_tests
            .lock()
            .await
            .extend(outcome.failed_tests);

        let completed = state.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed % progress_step == 0 || completed == test_count {
            tracing::info!("Completed {}/{} rounds", completed, test_count);
        }
    }
}
