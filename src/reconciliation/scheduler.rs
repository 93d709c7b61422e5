//! Scheduler entry point, meant to be called by a periodic job

use chrono::NaiveDateTime;

use crate::config::SchedulerConfig;
use crate::reconciliation::Reconciler;
use crate::traits::*;
use crate::types::*;

impl<S: ReconcileStorage + Clone> Reconciler<S> {
    /// Run the task that has waited the longest, or every task with `run_all`
    ///
    /// Tasks that never ran come first. Fails when no task is configured.
    pub async fn run_scheduler(&self, run_all: bool) -> ReconcileResult<Vec<HistoryEntry>> {
        let tasks = self.storage.list_tasks().await?;
        if tasks.is_empty() {
            return Err(ReconcileError::Precondition(
                "No easy reconcile available".to_string(),
            ));
        }

        if run_all {
            tracing::info!(tasks = tasks.len(), "running all reconcile tasks");
            return Ok(self.run_tasks(&tasks).await);
        }

        let oldest = self.oldest_task(tasks).await?;
        tracing::info!(task = %oldest.name, "running least recently reconciled task");
        Ok(self.run_tasks(std::slice::from_ref(&oldest)).await)
    }

    /// Run the scheduler with settings loaded from configuration
    pub async fn run_scheduler_with(
        &self,
        config: &SchedulerConfig,
    ) -> ReconcileResult<Vec<HistoryEntry>> {
        self.run_scheduler(config.run_all).await
    }

    async fn oldest_task(&self, tasks: Vec<ReconcileTask>) -> ReconcileResult<ReconcileTask> {
        let mut oldest: Option<(NaiveDateTime, ReconcileTask)> = None;

        for task in tasks {
            let last_run = self
                .storage
                .last_history(&task.id)
                .await?
                .map(|entry| entry.date)
                .unwrap_or(NaiveDateTime::MIN);

            // Strictly older only, so ties keep storage order
            if oldest.as_ref().is_none_or(|(date, _)| last_run < *date) {
                oldest = Some((last_run, task));
            }
        }

        oldest
            .map(|(_, task)| task)
            .ok_or_else(|| ReconcileError::Precondition("No easy reconcile available".to_string()))
    }
}
