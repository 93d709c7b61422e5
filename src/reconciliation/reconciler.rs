//! Reconciler orchestrating task runs over the configured matching strategies

use std::collections::BTreeSet;

use crate::reconciliation::task::{ordered_methods, TaskManager};
use crate::reconciliation::{IndependentTransaction, StrategyRegistry};
use crate::traits::*;
use crate::types::*;

/// Main reconciliation system: task configuration, runs and history
pub struct Reconciler<S: ReconcileStorage> {
    pub(crate) storage: S,
    task_manager: TaskManager<S>,
    strategies: StrategyRegistry<S>,
}

impl<S: ReconcileStorage + Clone> Reconciler<S> {
    /// Create a new reconciler with the given storage backend and strategies
    pub fn new(storage: S, strategies: StrategyRegistry<S>) -> Self {
        Self {
            task_manager: TaskManager::new(storage.clone()),
            storage,
            strategies,
        }
    }

    /// Create a new reconciler with a custom task validator
    pub fn with_validator(
        storage: S,
        strategies: StrategyRegistry<S>,
        validator: Box<dyn TaskValidator>,
    ) -> Self {
        Self {
            task_manager: TaskManager::with_validator(storage.clone(), validator),
            storage,
            strategies,
        }
    }

    /// Task configuration operations
    pub fn tasks(&self) -> &TaskManager<S> {
        &self.task_manager
    }

    /// Storage backend shared by the task manager and the runs
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create a new reconcile task
    pub async fn create_task(
        &self,
        name: String,
        account_id: String,
        period_id: Option<String>,
        company_id: Option<String>,
    ) -> ReconcileResult<ReconcileTask> {
        self.task_manager
            .create_task(name, account_id, period_id, company_id)
            .await
    }

    /// Add a method to a task
    pub async fn add_method(
        &self,
        task_id: &str,
        kind: StrategyKind,
        sequence: i32,
        options: ReconcileOptions,
    ) -> ReconcileResult<MethodConfig> {
        self.task_manager
            .add_method(task_id, kind, sequence, options)
            .await
    }

    /// Delete a task and its methods
    pub async fn delete_task(&self, task_id: &str) -> ReconcileResult<()> {
        self.task_manager.delete_task(task_id).await
    }

    /// Run the given tasks one after another
    ///
    /// A failing task never stops the others: its error is logged, posted on
    /// the task and recorded as an empty history entry. Only an unknown task
    /// id fails the call, before anything runs.
    pub async fn run_reconcile(&self, task_ids: &[String]) -> ReconcileResult<Vec<HistoryEntry>> {
        let mut tasks = Vec::with_capacity(task_ids.len());
        for task_id in task_ids {
            tasks.push(self.task_manager.get_task_required(task_id).await?);
        }

        Ok(self.run_tasks(&tasks).await)
    }

    pub(crate) async fn run_tasks(&self, tasks: &[ReconcileTask]) -> Vec<HistoryEntry> {
        let mut entries = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.run_task(task).await {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::error!(
                        task = %task.name,
                        %error,
                        "could not record the outcome of the reconcile task"
                    );
                }
            }
        }
        entries
    }

    async fn run_task(&self, task: &ReconcileTask) -> ReconcileResult<HistoryEntry> {
        let commit_every = match self.commit_every(task).await {
            Ok(commit_every) => commit_every,
            Err(error) => return record_failure(&self.storage, task, &error).await,
        };

        match commit_every {
            Some(batch) => {
                let transaction = match IndependentTransaction::begin(&self.storage).await {
                    Ok(transaction) => transaction,
                    Err(error) => return record_failure(&self.storage, task, &error).await,
                };

                let outcome = self.execute(transaction.storage(), task, Some(batch)).await;
                if let Err(error) = transaction.finish() {
                    tracing::error!(task = %task.name, %error, "failed to commit reconcile task");
                }
                outcome
            }
            None => self.execute(&self.storage, task, None).await,
        }
    }

    /// Batch size configured on the company of the task's account
    async fn commit_every(&self, task: &ReconcileTask) -> ReconcileResult<Option<u32>> {
        let account = self
            .storage
            .get_account(&task.account_id)
            .await?
            .ok_or_else(|| ReconcileError::AccountNotFound(task.account_id.clone()))?;

        let Some(company_id) = account.company_id else {
            return Ok(None);
        };

        Ok(self
            .storage
            .get_company(&company_id)
            .await?
            .and_then(|company| company.reconciliation_commit_every)
            .filter(|batch| *batch > 0))
    }

    async fn execute(
        &self,
        storage: &S,
        task: &ReconcileTask,
        commit_every: Option<u32>,
    ) -> ReconcileResult<HistoryEntry> {
        match self.reconcile(storage, task, commit_every).await {
            Ok(entry) => Ok(entry),
            Err(error) => record_failure(storage, task, &error).await,
        }
    }

    async fn reconcile(
        &self,
        storage: &S,
        task: &ReconcileTask,
        commit_every: Option<u32>,
    ) -> ReconcileResult<HistoryEntry> {
        let mut all_reconciled = Vec::new();
        let mut all_partial = Vec::new();

        for method in ordered_methods(storage, &task.id).await? {
            tracing::debug!(
                task = %task.name,
                method = %method.kind,
                sequence = method.sequence,
                "running reconcile method"
            );
            let strategy = self.strategies.get(method.kind)?;
            let params = ReconcileParams::for_method(task, &method, commit_every);
            let outcome = strategy.automatic_reconcile(storage, &params).await?;

            all_reconciled.extend(outcome.reconciled);
            all_partial.extend(outcome.partial);
        }

        let mut reconcile_ids: BTreeSet<ReconcileGroupId> =
            find_reconcile_ids(storage, ReconcileKind::Full, &all_reconciled)
                .await?
                .into_iter()
                .collect();
        let mut partial_ids: BTreeSet<ReconcileGroupId> =
            find_reconcile_ids(storage, ReconcileKind::Partial, &all_partial)
                .await?
                .into_iter()
                .collect();

        // A line reported by one method may have been moved to the other
        // kind of group by a later one.
        partial_ids
            .extend(find_reconcile_ids(storage, ReconcileKind::Partial, &all_reconciled).await?);
        reconcile_ids
            .extend(find_reconcile_ids(storage, ReconcileKind::Full, &all_partial).await?);

        let entry = HistoryEntry::new(
            task.id.clone(),
            chrono::Utc::now().naive_utc(),
            reconcile_ids,
            partial_ids,
        );
        storage.append_history(&entry).await?;

        tracing::info!(
            task = %task.name,
            reconciled = entry.reconcile_ids.len(),
            partial = entry.reconcile_partial_ids.len(),
            "reconcile task finished"
        );

        Ok(entry)
    }
}

async fn find_reconcile_ids<S: ReconcileStorage>(
    storage: &S,
    kind: ReconcileKind,
    line_ids: &[MoveLineId],
) -> ReconcileResult<Vec<ReconcileGroupId>> {
    if line_ids.is_empty() {
        return Ok(Vec::new());
    }
    storage.find_reconcile_ids(kind, line_ids).await
}

/// Log a failed run, post it on the task and record an empty history entry
///
/// The empty entry moves the task's last run forward so the scheduler does
/// not pick the same failing task again on its next tick.
async fn record_failure<S: ReconcileStorage>(
    storage: &S,
    task: &ReconcileTask,
    error: &ReconcileError,
) -> ReconcileResult<HistoryEntry> {
    tracing::error!(
        task = %task.name,
        error = ?error,
        "The reconcile task {} had an exception: {}",
        task.name,
        error
    );

    let now = chrono::Utc::now().naive_utc();
    let message = TaskMessage {
        task_id: task.id.clone(),
        date: now,
        body: format!("There was an error during reconciliation : {}", error),
    };
    if let Err(post_error) = storage.post_message(&message).await {
        tracing::warn!(task = %task.name, error = %post_error, "could not post reconcile error");
    }

    let entry = HistoryEntry::empty(task.id.clone(), now);
    storage.append_history(&entry).await?;
    Ok(entry)
}
