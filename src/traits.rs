//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Storage abstraction for the reconciliation system
///
/// This trait allows the reconciliation core to work with any storage backend
/// (PostgreSQL, the ERP's own database, in-memory, etc.) by implementing these
/// methods. A handle represents one transactional context; `begin_independent`
/// opens another one that is committed separately from the caller's.
#[async_trait]
pub trait ReconcileStorage: Send + Sync + Sized {
    /// Save a new task
    async fn save_task(&self, task: &ReconcileTask) -> ReconcileResult<()>;

    /// Get a task by ID
    async fn get_task(&self, task_id: &str) -> ReconcileResult<Option<ReconcileTask>>;

    /// List all tasks in storage order
    async fn list_tasks(&self) -> ReconcileResult<Vec<ReconcileTask>>;

    /// Update an existing task
    async fn update_task(&self, task: &ReconcileTask) -> ReconcileResult<()>;

    /// Delete a task; methods must have been removed beforehand
    async fn delete_task(&self, task_id: &str) -> ReconcileResult<()>;

    /// Save a method configuration
    async fn save_method(&self, method: &MethodConfig) -> ReconcileResult<()>;

    /// List the methods of a task, in insertion order
    async fn list_methods(&self, task_id: &str) -> ReconcileResult<Vec<MethodConfig>>;

    /// Delete a method configuration
    async fn delete_method(&self, method_id: &str) -> ReconcileResult<()>;

    /// Append a history entry
    async fn append_history(&self, entry: &HistoryEntry) -> ReconcileResult<()>;

    /// List the history entries of a task, in insertion order
    async fn list_history(&self, task_id: &str) -> ReconcileResult<Vec<HistoryEntry>>;

    /// Latest history entry of a task by date; ties resolve to the entry appended last
    async fn last_history(&self, task_id: &str) -> ReconcileResult<Option<HistoryEntry>> {
        let entries = self.list_history(task_id).await?;
        Ok(entries.into_iter().max_by_key(|entry| entry.date))
    }

    /// Post a message on the task's operator channel
    async fn post_message(&self, message: &TaskMessage) -> ReconcileResult<()>;

    /// Messages of a task, oldest first
    async fn list_messages(&self, task_id: &str) -> ReconcileResult<Vec<TaskMessage>>;

    /// Get a ledger account by ID
    async fn get_account(&self, account_id: &str) -> ReconcileResult<Option<LedgerAccount>>;

    /// Get a company by ID
    async fn get_company(&self, company_id: &str) -> ReconcileResult<Option<Company>>;

    /// Get a move line by ID
    async fn get_move_line(&self, line_id: MoveLineId) -> ReconcileResult<Option<MoveLine>>;

    /// Search move lines matching a query, ordered by ID
    async fn search_move_lines(&self, query: &LineQuery) -> ReconcileResult<Vec<MoveLine>>;

    /// Count move lines matching a query
    async fn count_move_lines(&self, query: &LineQuery) -> ReconcileResult<usize> {
        Ok(self.search_move_lines(query).await?.len())
    }

    /// Move lines belonging to any of the given groups, ordered by ID
    async fn lines_in_groups(
        &self,
        kind: ReconcileKind,
        group_ids: &[ReconcileGroupId],
    ) -> ReconcileResult<Vec<MoveLine>>;

    /// Distinct, non-null group ids of the given kind for these lines
    async fn find_reconcile_ids(
        &self,
        kind: ReconcileKind,
        line_ids: &[MoveLineId],
    ) -> ReconcileResult<Vec<ReconcileGroupId>>;

    /// Reconcile lines together and return the new group id
    ///
    /// A full reconciliation clears any partial group on the lines.
    async fn create_reconciliation(
        &self,
        kind: ReconcileKind,
        line_ids: &[MoveLineId],
    ) -> ReconcileResult<ReconcileGroupId>;

    /// Get an invoice by ID
    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>>;

    /// Open a transactional context independent of this one
    async fn begin_independent(&self) -> ReconcileResult<Self>;

    /// Commit the work done through this handle
    fn commit(&self) -> ReconcileResult<()>;

    /// Release the transactional context held by this handle
    fn close(&self);
}

/// Parameters handed to a matching strategy for one method run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileParams {
    pub account_id: String,
    pub period_id: Option<String>,
    #[serde(flatten)]
    pub options: ReconcileOptions,
    /// Batch size for intermediate commits, when the company enables it
    pub commit_every: Option<u32>,
}

impl ReconcileParams {
    /// Build the parameters of a method run on a task
    pub fn for_method(
        task: &ReconcileTask,
        method: &MethodConfig,
        commit_every: Option<u32>,
    ) -> Self {
        Self {
            account_id: task.account_id.clone(),
            period_id: task.period_id.clone(),
            options: method.options.clone(),
            commit_every,
        }
    }
}

/// Lines a strategy reconciled, fully or partially
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub reconciled: Vec<MoveLineId>,
    pub partial: Vec<MoveLineId>,
}

/// A matching algorithm proposing and writing reconciliations
#[async_trait]
pub trait MatchingStrategy<S: ReconcileStorage>: Send + Sync {
    /// Reconcile what the strategy can find and report the touched lines
    async fn automatic_reconcile(
        &self,
        storage: &S,
        params: &ReconcileParams,
    ) -> ReconcileResult<MatchOutcome>;
}

/// Trait for implementing custom task validation rules
pub trait TaskValidator: Send + Sync {
    /// Validate a task before saving
    fn validate_task(&self, task: &ReconcileTask) -> ReconcileResult<()>;

    /// Validate method options before saving
    fn validate_options(&self, options: &ReconcileOptions) -> ReconcileResult<()>;
}

/// Default task validator with basic rules
pub struct DefaultTaskValidator;

impl TaskValidator for DefaultTaskValidator {
    fn validate_task(&self, task: &ReconcileTask) -> ReconcileResult<()> {
        if task.name.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "Task name cannot be empty".to_string(),
            ));
        }

        if task.account_id.trim().is_empty() {
            return Err(ReconcileError::Validation(
                "A reconcile task must reference an account".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_options(&self, options: &ReconcileOptions) -> ReconcileResult<()> {
        crate::utils::validate_write_off(&options.write_off)
    }
}
