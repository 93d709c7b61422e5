//! Reconciliation history and navigation to the underlying move lines

use crate::reconciliation::Reconciler;
use crate::traits::*;
use crate::types::*;

fn task_lines(task: &ReconcileTask, state: ReconcileState) -> LineQuery {
    LineQuery {
        account_id: task.account_id.clone(),
        period_id: task.period_id.clone(),
        state,
    }
}

impl HistoryEntry {
    /// Open the move lines of the full reconciliations of this run
    pub async fn open_reconcile<S: ReconcileStorage>(
        &self,
        storage: &S,
    ) -> ReconcileResult<MoveLineAction> {
        let groups: Vec<ReconcileGroupId> = self.reconcile_ids.iter().copied().collect();
        let lines = storage.lines_in_groups(ReconcileKind::Full, &groups).await?;
        Ok(MoveLineAction::new(
            "Reconciliations",
            lines.into_iter().map(|line| line.id).collect(),
        ))
    }

    /// Open the move lines of the partial reconciliations of this run
    pub async fn open_partial<S: ReconcileStorage>(
        &self,
        storage: &S,
    ) -> ReconcileResult<MoveLineAction> {
        let groups: Vec<ReconcileGroupId> = self.reconcile_partial_ids.iter().copied().collect();
        let lines = storage.lines_in_groups(ReconcileKind::Partial, &groups).await?;
        Ok(MoveLineAction::new(
            "Partial reconciliations",
            lines.into_iter().map(|line| line.id).collect(),
        ))
    }
}

impl<S: ReconcileStorage + Clone> Reconciler<S> {
    /// Number of lines with neither a full nor a partial reconciliation
    pub async fn unreconciled_count(&self, task_id: &str) -> ReconcileResult<usize> {
        let task = self.tasks().get_task_required(task_id).await?;
        self.storage
            .count_move_lines(&task_lines(&task, ReconcileState::Unreconciled))
            .await
    }

    /// Number of partially reconciled lines
    pub async fn reconciled_partial_count(&self, task_id: &str) -> ReconcileResult<usize> {
        let task = self.tasks().get_task_required(task_id).await?;
        self.storage
            .count_move_lines(&task_lines(&task, ReconcileState::PartiallyReconciled))
            .await
    }

    /// Open the unreconciled lines of the task
    pub async fn open_unreconcile(&self, task_id: &str) -> ReconcileResult<MoveLineAction> {
        let task = self.tasks().get_task_required(task_id).await?;
        let lines = self
            .storage
            .search_move_lines(&task_lines(&task, ReconcileState::Unreconciled))
            .await?;
        Ok(MoveLineAction::new(
            "Unreconciled items",
            lines.into_iter().map(|line| line.id).collect(),
        ))
    }

    /// Open the partially reconciled lines of the task
    pub async fn open_partial_reconcile(&self, task_id: &str) -> ReconcileResult<MoveLineAction> {
        let task = self.tasks().get_task_required(task_id).await?;
        let lines = self
            .storage
            .search_move_lines(&task_lines(&task, ReconcileState::PartiallyReconciled))
            .await?;
        Ok(MoveLineAction::new(
            "Partial reconciled items",
            lines.into_iter().map(|line| line.id).collect(),
        ))
    }

    /// All history entries of a task, oldest first
    pub async fn history(&self, task_id: &str) -> ReconcileResult<Vec<HistoryEntry>> {
        self.storage.list_history(task_id).await
    }

    /// Latest run of a task
    pub async fn last_history(&self, task_id: &str) -> ReconcileResult<Option<HistoryEntry>> {
        self.storage.last_history(task_id).await
    }

    /// Open the lines fully reconciled by the last run
    pub async fn last_history_reconcile(&self, task_id: &str) -> ReconcileResult<MoveLineAction> {
        self.required_last_history(task_id)
            .await?
            .open_reconcile(&self.storage)
            .await
    }

    /// Open the lines partially reconciled by the last run
    pub async fn last_history_partial(&self, task_id: &str) -> ReconcileResult<MoveLineAction> {
        self.required_last_history(task_id)
            .await?
            .open_partial(&self.storage)
            .await
    }

    /// Messages posted on the task, oldest first
    pub async fn task_messages(&self, task_id: &str) -> ReconcileResult<Vec<TaskMessage>> {
        self.storage.list_messages(task_id).await
    }

    async fn required_last_history(&self, task_id: &str) -> ReconcileResult<HistoryEntry> {
        let task = self.tasks().get_task_required(task_id).await?;
        self.storage
            .last_history(&task.id)
            .await?
            .ok_or(ReconcileError::NoHistory { task: task.name })
    }
}
