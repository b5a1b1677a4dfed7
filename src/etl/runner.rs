//! DAG execution
//!
//! [`DagRunner`] walks a [`TaskGraph`] layer by layer, runs the tasks of a
//! layer concurrently, retries failures and skips the descendants of failed
//! tasks. What a task actually does is up to the [`TaskExecutor`].

use super::TaskGraph;
use eyre::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Runs a single task by id
///
/// # Example
/// ```no_run
/// use bank_etl::etl::TaskExecutor;
/// use eyre::Result;
///
/// struct Echo;
///
/// impl TaskExecutor for Echo {
///     async fn execute(&self, task_id: &str) -> Result<()> {
///         println!("running {}", task_id);
///         Ok(())
///     }
/// }
/// ```
pub trait TaskExecutor: Send + Sync + 'static {
    /// Execute the task once
    ///
    /// # Errors
    /// Any error fails this attempt of the task
    fn execute(&self, task_id: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// How often and how patiently a failed task is retried
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total number of attempts a task gets
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Final state of a task in a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Success { attempts: u32 },
    Failed { attempts: u32, error: String },
    /// Never started because an upstream task did not succeed
    UpstreamFailed,
}

impl TaskState {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { attempts } => write!(f, "success (attempts: {})", attempts),
            Self::Failed { attempts, error } => {
                write!(f, "failed (attempts: {}): {}", attempts, error)
            }
            Self::UpstreamFailed => write!(f, "upstream failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutcome {
    pub task_id: String,
    pub state: TaskState,
}

/// Outcome of every task in a run, in topological order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    /// True if every task succeeded
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.state.is_success())
    }

    /// State of a task, if it is part of the run
    pub fn state(&self, task_id: &str) -> Option<&TaskState> {
        self.outcomes
            .iter()
            .find(|o| o.task_id == task_id)
            .map(|o| &o.state)
    }

    /// Tasks that ran and failed
    pub fn failed(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, TaskState::Failed { .. }))
    }
}

/// Executes a task graph
pub struct DagRunner {
    graph: TaskGraph,
    policy: RetryPolicy,
}

impl DagRunner {
    /// Create a runner for a validated graph
    ///
    /// # Errors
    /// Returns an error if the graph is not a valid DAG
    pub fn try_new(graph: TaskGraph, policy: RetryPolicy) -> Result<Self> {
        graph.validate()?;
        Ok(Self { graph, policy })
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run every task of the graph once (plus retries)
    ///
    /// A task starts only after all of its upstream tasks succeeded. Task
    /// failures are recorded in the report rather than returned as errors.
    pub async fn run<E: TaskExecutor>(&self, executor: Arc<E>) -> Result<RunReport> {
        let stages = self.graph.stages()?;
        let mut states: HashMap<String, TaskState> = HashMap::new();

        for (index, stage) in stages.iter().enumerate() {
            log::debug!("Stage {}: {}", index + 1, stage.join(", "));
            let mut set = JoinSet::new();

            for task_id in stage {
                let blocked = self
                    .graph
                    .upstream(task_id)
                    .into_iter()
                    .any(|up| !states.get(up).is_some_and(TaskState::is_success));

                if blocked {
                    log::warn!("Skipping {}: upstream task failed", task_id.yellow());
                    states.insert(task_id.clone(), TaskState::UpstreamFailed);
                    continue;
                }

                // Overwritten when the task joins; only survives a panic
                states.insert(
                    task_id.clone(),
                    TaskState::Failed {
                        attempts: 0,
                        error: "task panicked".to_string(),
                    },
                );

                let executor = Arc::clone(&executor);
                let policy = self.policy.clone();
                let task_id = task_id.clone();
                set.spawn(async move {
                    let state = run_with_retries(executor.as_ref(), &task_id, &policy).await;
                    (task_id, state)
                });
            }

            while let Some(res) = set.join_next().await {
                match res {
                    Ok((task_id, state)) => {
                        states.insert(task_id, state);
                    }
                    Err(e) => log::error!("Task panicked: {}", e),
                }
            }
        }

        let outcomes = stages
            .into_iter()
            .flatten()
            .map(|task_id| {
                let state = states
                    .remove(&task_id)
                    .unwrap_or(TaskState::UpstreamFailed);
                TaskOutcome { task_id, state }
            })
            .collect();

        Ok(RunReport { outcomes })
    }
}

async fn run_with_retries<E: TaskExecutor>(
    executor: &E,
    task_id: &str,
    policy: &RetryPolicy,
) -> TaskState {
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        log::info!(
            "Running {} (attempt {}/{})",
            task_id.cyan(),
            attempt,
            max_attempts
        );

        match executor.execute(task_id).await {
            Ok(()) => {
                log::info!("✓ {} succeeded", task_id.cyan());
                return TaskState::Success { attempts: attempt };
            }
            Err(e) if attempt < max_attempts => {
                log::warn!("{} failed, will retry: {:#}", task_id.cyan(), e);
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(e) => {
                log::error!("{} failed: {:#}", task_id.cyan(), e);
                return TaskState::Failed {
                    attempts: attempt,
                    error: format!("{:#}", e),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records execution order and fails chosen tasks a number of times
    #[derive(Default)]
    struct ScriptedExecutor {
        failures: Mutex<HashMap<String, u32>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn failing(task_id: &str, times: u32) -> Self {
            let executor = Self::default();
            executor
                .failures
                .lock()
                .unwrap()
                .insert(task_id.to_string(), times);
            executor
        }

        fn executed(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl TaskExecutor for ScriptedExecutor {
        async fn execute(&self, task_id: &str) -> Result<()> {
            self.log.lock().unwrap().push(task_id.to_string());
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(task_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    eyre::bail!("{} exploded", task_id);
                }
            }
            Ok(())
        }
    }

    fn fan_out_graph() -> TaskGraph {
        let mut graph = TaskGraph::new();
        graph.add_edge("start", "middle");
        graph.fan_out("middle", &["left", "right"]);
        graph
    }

    #[tokio::test]
    async fn test_runs_all_tasks_in_order() {
        let runner = DagRunner::try_new(fan_out_graph(), RetryPolicy::default()).unwrap();
        let executor = Arc::new(ScriptedExecutor::default());

        let report = runner.run(executor.clone()).await.unwrap();

        assert!(report.succeeded());
        let executed = executor.executed();
        assert_eq!(executed.len(), 4);
        assert_eq!(executed[0], "start");
        assert_eq!(executed[1], "middle");
        assert!(executed[2..].contains(&"left".to_string()));
        assert!(executed[2..].contains(&"right".to_string()));
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.task_id.as_str()).collect();
        assert_eq!(ids, vec!["start", "middle", "left", "right"]);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let runner =
            DagRunner::try_new(fan_out_graph(), RetryPolicy::new(1, Duration::ZERO)).unwrap();
        let executor = Arc::new(ScriptedExecutor::failing("middle", 1));

        let report = runner.run(executor).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(
            report.state("middle"),
            Some(&TaskState::Success { attempts: 2 })
        );
    }

    #[tokio::test]
    async fn test_failure_blocks_descendants() {
        let runner =
            DagRunner::try_new(fan_out_graph(), RetryPolicy::new(1, Duration::ZERO)).unwrap();
        let executor = Arc::new(ScriptedExecutor::failing("middle", 5));

        let report = runner.run(executor.clone()).await.unwrap();

        assert!(!report.succeeded());
        match report.state("middle") {
            Some(TaskState::Failed { attempts, error }) => {
                assert_eq!(*attempts, 2);
                assert!(error.contains("middle exploded"));
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(report.state("left"), Some(&TaskState::UpstreamFailed));
        assert_eq!(report.state("right"), Some(&TaskState::UpstreamFailed));
        assert!(!executor.executed().contains(&"left".to_string()));
        assert_eq!(report.failed().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_leaf_does_not_block_sibling() {
        let runner = DagRunner::try_new(fan_out_graph(), RetryPolicy::default()).unwrap();
        let executor = Arc::new(ScriptedExecutor::failing("left", 1));

        let report = runner.run(executor).await.unwrap();

        assert!(!report.succeeded());
        assert!(matches!(
            report.state("left"),
            Some(TaskState::Failed { attempts: 1, .. })
        ));
        assert_eq!(
            report.state("right"),
            Some(&TaskState::Success { attempts: 1 })
        );
    }

    #[test]
    fn test_rejects_invalid_graph() {
        let mut graph = fan_out_graph();
        graph.add_edge("left", "start");
        assert!(DagRunner::try_new(graph, RetryPolicy::default()).is_err());
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 1);
        assert_eq!(RetryPolicy::new(3, Duration::ZERO).max_attempts(), 4);
    }
}
