//! Orchestrator - drives eligible items to completion in dependency order
//!
//! Operations run first, then conflicts. Each stage proceeds in waves:
//!
//! ```text
//!   next_executable() ──► mark_started ──► spawn (bounded by semaphore)
//!          ▲                                    │ retry + timeout
//!          │                                    ▼
//!          └──── mark_completed / mark_failed ◄─ join
//! ```
//!
//! Workers receive owned copies of the entities and only return an outcome;
//! every status change is applied here, on the task that owns the registry.
//! When no item is eligible but some are unfinished, pending items downstream
//! of a failure are reported as blocked and anything else (including items
//! left in progress) fails the run with [`OrchestratorError::Unresolvable`].

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use namefix_core::{config::OrchestratorConfig, domain::Status, ports::IExecutionLayer};

use crate::{error::OrchestratorError, registry::Registry};

// ============================================================================
// Settings
// ============================================================================

/// Execution limits applied to every item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Attempts per item before it is marked failed (at least 1)
    pub max_attempts: u32,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
    /// Items executed at the same time within one wave
    pub max_concurrent: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: config.attempt_timeout(),
            max_concurrent: config.max_concurrent,
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// An item that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub key: String,
    pub error: String,
}

/// Outcome of one stage (operations or conflicts)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    /// Keys completed in this run, in completion order
    pub completed: Vec<String>,
    /// Keys that failed in this run
    pub failed: Vec<FailedItem>,
    /// Pending keys that can never run because something upstream failed
    pub blocked: Vec<String>,
    /// Attempts spent per dispatched key
    pub attempts: BTreeMap<String, u32>,
    /// Number of waves dispatched
    pub waves: usize,
}

impl StageReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }

    fn record(&mut self, key: &str, outcome: &AttemptOutcome) {
        self.attempts.insert(key.to_string(), outcome.attempts);
        match &outcome.result {
            Ok(()) => self.completed.push(key.to_string()),
            Err(error) => self.failed.push(FailedItem {
                key: key.to_string(),
                error: error.clone(),
            }),
        }
    }
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub operations: StageReport,
    pub conflicts: StageReport,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.operations.is_success() && self.conflicts.is_success()
    }
}

#[derive(Debug)]
struct AttemptOutcome {
    attempts: u32,
    result: Result<(), String>,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns a registry and executes it through an [`IExecutionLayer`]
pub struct Orchestrator {
    registry: Registry,
    executor: Arc<dyn IExecutionLayer>,
    settings: OrchestratorSettings,
    semaphore: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        executor: Arc<dyn IExecutionLayer>,
        settings: OrchestratorSettings,
    ) -> Self {
        let permits = settings.max_concurrent.max(1);
        Self {
            registry,
            executor,
            settings,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Runs every operation, then every conflict
    ///
    /// # Errors
    ///
    /// `Unresolvable` if a stage stalls for a reason other than a failed
    /// dependency. Statuses reached before the error are kept.
    pub async fn run(&mut self) -> Result<RunReport, OrchestratorError> {
        let operations = self.run_operations().await?;
        let conflicts = self.resolve_conflicts().await?;

        info!(
            operations_completed = operations.completed.len(),
            operations_failed = operations.failed.len(),
            conflicts_completed = conflicts.completed.len(),
            conflicts_failed = conflicts.failed.len(),
            "Run finished"
        );
        Ok(RunReport {
            operations,
            conflicts,
        })
    }

    /// Executes rename operations until none are eligible
    pub async fn run_operations(&mut self) -> Result<StageReport, OrchestratorError> {
        let mut report = StageReport::default();

        loop {
            let wave = self.registry.next_executable();
            if wave.is_empty() {
                break;
            }
            report.waves += 1;
            info!(wave = report.waves, size = wave.len(), "Dispatching operation wave");

            let mut tasks = JoinSet::new();
            for key in wave {
                self.registry.mark_started(&key)?;
                let operation = self
                    .registry
                    .operation(&key)
                    .cloned()
                    .ok_or_else(|| OrchestratorError::UnknownOperation(key.to_string()))?;
                let executor = Arc::clone(&self.executor);
                let semaphore = Arc::clone(&self.semaphore);
                let settings = self.settings.clone();

                tasks.spawn(async move {
                    let label = operation.old_name().to_string();
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            with_retry(&settings, &label, || executor.apply_rename(&operation))
                                .await
                        }
                        Err(_) => AttemptOutcome {
                            attempts: 0,
                            result: Err("semaphore closed".to_string()),
                        },
                    };
                    (key, outcome)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (key, outcome) = joined.map_err(|e| OrchestratorError::Task(e.to_string()))?;
                match &outcome.result {
                    Ok(()) => self.registry.mark_completed(&key)?,
                    Err(error) => self.registry.mark_failed(&key, error.clone())?,
                }
                report.record(key.as_str(), &outcome);
            }
        }

        let unresolved: Vec<String> = self
            .registry
            .operations()
            .filter(|o| !o.status().is_terminal())
            .map(|o| o.old_name().to_string())
            .collect();
        // Only items still waiting can be blocked; a leftover InProgress
        // item is never picked up again
        let (_, blocked) = self.registry.blocked_by_failure();
        let blocked: Vec<String> = blocked
            .iter()
            .filter(|k| {
                self.registry
                    .operation(k)
                    .is_some_and(|o| o.status() == Status::Pending)
            })
            .map(ToString::to_string)
            .collect();
        report.blocked = settle(unresolved, blocked, "operation")?;
        Ok(report)
    }

    /// Resolves conflicts until none are eligible
    pub async fn resolve_conflicts(&mut self) -> Result<StageReport, OrchestratorError> {
        let mut report = StageReport::default();

        loop {
            let wave = self.registry.next_resolvable();
            if wave.is_empty() {
                break;
            }
            report.waves += 1;
            info!(wave = report.waves, size = wave.len(), "Dispatching conflict wave");

            let mut tasks = JoinSet::new();
            for key in wave {
                self.registry
                    .update_conflict_status(&key, Status::InProgress)?;
                let conflict = self
                    .registry
                    .conflict(&key)
                    .cloned()
                    .ok_or_else(|| OrchestratorError::UnknownConflict(key.to_string()))?;
                let executor = Arc::clone(&self.executor);
                let semaphore = Arc::clone(&self.semaphore);
                let settings = self.settings.clone();

                tasks.spawn(async move {
                    let label = conflict.name().to_string();
                    let outcome = match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            with_retry(&settings, &label, || executor.resolve_conflict(&conflict))
                                .await
                        }
                        Err(_) => AttemptOutcome {
                            attempts: 0,
                            result: Err("semaphore closed".to_string()),
                        },
                    };
                    (key, outcome)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (key, outcome) = joined.map_err(|e| OrchestratorError::Task(e.to_string()))?;
                let status = match &outcome.result {
                    Ok(()) => Status::Completed,
                    Err(error) => {
                        warn!(conflict = %key, error = %error, "Conflict resolution failed");
                        Status::Failed
                    }
                };
                self.registry.update_conflict_status(&key, status)?;
                report.record(key.as_str(), &outcome);
            }
        }

        let unresolved: Vec<String> = self
            .registry
            .conflicts()
            .filter(|c| !c.status().is_terminal())
            .map(|c| c.name().to_string())
            .collect();
        let (blocked, _) = self.registry.blocked_by_failure();
        let blocked: Vec<String> = blocked
            .iter()
            .filter(|k| {
                self.registry
                    .conflict(k)
                    .is_some_and(|c| c.status() == Status::Pending)
            })
            .map(ToString::to_string)
            .collect();
        report.blocked = settle(unresolved, blocked, "conflict")?;
        Ok(report)
    }
}

/// Splits the unfinished leftovers of a stalled stage
///
/// Returns the blocked keys, or `Unresolvable` naming every unfinished key
/// that is not explained by a failure upstream.
fn settle(
    pending: Vec<String>,
    blocked: Vec<String>,
    stage: &str,
) -> Result<Vec<String>, OrchestratorError> {
    let blocked_set: BTreeSet<&str> = blocked.iter().map(String::as_str).collect();
    let stuck: Vec<String> = pending
        .iter()
        .filter(|k| !blocked_set.contains(k.as_str()))
        .cloned()
        .collect();

    if !stuck.is_empty() {
        warn!(stage, stuck = %stuck.join(", "), "Dependency graph cannot make progress");
        return Err(OrchestratorError::Unresolvable { pending: stuck });
    }
    if !blocked.is_empty() {
        warn!(stage, blocked = blocked.len(), "Items blocked by failed dependencies");
    }
    Ok(blocked
        .into_iter()
        .filter(|k| pending.contains(k))
        .collect())
}

/// Calls `attempt` until it succeeds, the attempts run out, or each try
/// exceeds the timeout
async fn with_retry<F, Fut>(
    settings: &OrchestratorSettings,
    label: &str,
    mut attempt: F,
) -> AttemptOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut last_error = String::new();

    for n in 1..=max_attempts {
        debug!(item = label, attempt = n, "Executing");
        match tokio::time::timeout(settings.attempt_timeout, attempt()).await {
            Ok(Ok(())) => {
                return AttemptOutcome {
                    attempts: n,
                    result: Ok(()),
                }
            }
            Ok(Err(e)) => last_error = format!("{e:#}"),
            Err(_) => {
                last_error = format!(
                    "timed out after {}s",
                    settings.attempt_timeout.as_secs_f64()
                )
            }
        }
        if n < max_attempts {
            warn!(item = label, attempt = n, error = %last_error, "Attempt failed, retrying");
        }
    }

    AttemptOutcome {
        attempts: max_attempts,
        result: Err(last_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn settings(max_attempts: u32, timeout_ms: u64) -> OrchestratorSettings {
        OrchestratorSettings {
            max_attempts,
            attempt_timeout: Duration::from_millis(timeout_ms),
            max_concurrent: 2,
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = OrchestratorConfig::default();
        let settings = OrchestratorSettings::from(&config);
        assert_eq!(settings.max_attempts, config.max_attempts);
        assert_eq!(settings.attempt_timeout, config.attempt_timeout());
        assert_eq!(settings, OrchestratorSettings::default());
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let outcome = with_retry(&settings(3, 1_000), "x", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(anyhow::anyhow!("transient"));
            }
            Ok::<(), anyhow::Error>(())
        })
        .await;
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.is_ok());
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let outcome = with_retry(&settings(2, 1_000), "x", || async {
            Err::<(), _>(anyhow::anyhow!("permission denied"))
        })
        .await;
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.result.unwrap_err(), "permission denied");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_failure() {
        let outcome = with_retry(&settings(1, 50), "slow", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<(), anyhow::Error>(())
        })
        .await;
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.unwrap_err().contains("timed out"));
    }

    #[test]
    fn test_settle_separates_blocked_from_stuck() {
        let blocked = settle(
            vec!["b".into(), "c".into()],
            vec!["b".into(), "c".into()],
            "operation",
        )
        .unwrap();
        assert_eq!(blocked, vec!["b", "c"]);

        let err = settle(vec!["b".into(), "x".into()], vec!["b".into()], "operation").unwrap_err();
        match err {
            OrchestratorError::Unresolvable { pending } => assert_eq!(pending, vec!["x"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_report_success_requires_no_failures_or_blocks() {
        let mut report = RunReport::default();
        assert!(report.is_success());
        report.conflicts.blocked.push("B".into());
        assert!(!report.is_success());
    }
}
