//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<ReconcileTask>,
    methods: Vec<MethodConfig>,
    history: Vec<HistoryEntry>,
    messages: Vec<TaskMessage>,
    accounts: HashMap<String, LedgerAccount>,
    companies: HashMap<String, Company>,
    move_lines: BTreeMap<MoveLineId, MoveLine>,
    invoices: HashMap<String, Invoice>,
    last_group_id: ReconcileGroupId,
}

/// Counters of the independent transactional contexts opened on a storage
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionStats {
    pub opened: usize,
    pub committed: usize,
    pub closed: usize,
}

/// In-memory storage implementation for testing and development
///
/// Independent contexts share the same data; writes are visible immediately.
/// Opening, committing and closing them is only counted.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
    transactions: Arc<Mutex<TransactionStats>>,
    independent: bool,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            transactions: Arc::new(Mutex::new(TransactionStats::default())),
            independent: false,
        }
    }

    fn read(&self) -> ReconcileResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| ReconcileError::Storage("memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> ReconcileResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| ReconcileError::Storage("memory storage lock poisoned".to_string()))
    }

    fn record_transaction(&self, update: impl FnOnce(&mut TransactionStats)) {
        if let Ok(mut stats) = self.transactions.lock() {
            update(&mut stats);
        }
    }

    /// Whether this handle is an independent transactional context
    pub fn is_independent(&self) -> bool {
        self.independent
    }

    /// Snapshot of the transaction counters
    pub fn transaction_stats(&self) -> TransactionStats {
        self.transactions
            .lock()
            .map(|stats| *stats)
            .unwrap_or_default()
    }

    /// Add or replace a ledger account
    pub fn insert_account(&self, account: LedgerAccount) -> ReconcileResult<()> {
        self.write()?.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    /// Add or replace a company
    pub fn insert_company(&self, company: Company) -> ReconcileResult<()> {
        self.write()?.companies.insert(company.id.clone(), company);
        Ok(())
    }

    /// Add or replace a move line
    pub fn insert_move_line(&self, line: MoveLine) -> ReconcileResult<()> {
        self.write()?.move_lines.insert(line.id, line);
        Ok(())
    }

    /// Add or replace an invoice
    pub fn insert_invoice(&self, invoice: Invoice) -> ReconcileResult<()> {
        self.write()?.invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconcileResult<()> {
        *self.write()? = MemoryState::default();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReconcileStorage for MemoryStorage {
    async fn save_task(&self, task: &ReconcileTask) -> ReconcileResult<()> {
        let mut state = self.write()?;
        if state.tasks.iter().any(|existing| existing.id == task.id) {
            return Err(ReconcileError::Validation(format!(
                "Task with ID '{}' already exists",
                task.id
            )));
        }
        state.tasks.push(task.clone());
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> ReconcileResult<Option<ReconcileTask>> {
        Ok(self
            .read()?
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned())
    }

    async fn list_tasks(&self) -> ReconcileResult<Vec<ReconcileTask>> {
        Ok(self.read()?.tasks.clone())
    }

    async fn update_task(&self, task: &ReconcileTask) -> ReconcileResult<()> {
        let mut state = self.write()?;
        match state.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(ReconcileError::TaskNotFound(task.id.clone())),
        }
    }

    async fn delete_task(&self, task_id: &str) -> ReconcileResult<()> {
        let mut state = self.write()?;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != task_id);
        if state.tasks.len() == before {
            return Err(ReconcileError::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }

    async fn save_method(&self, method: &MethodConfig) -> ReconcileResult<()> {
        let mut state = self.write()?;
        match state
            .methods
            .iter_mut()
            .find(|existing| existing.id == method.id)
        {
            Some(existing) => *existing = method.clone(),
            None => state.methods.push(method.clone()),
        }
        Ok(())
    }

    async fn list_methods(&self, task_id: &str) -> ReconcileResult<Vec<MethodConfig>> {
        Ok(self
            .read()?
            .methods
            .iter()
            .filter(|method| method.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_method(&self, method_id: &str) -> ReconcileResult<()> {
        let mut state = self.write()?;
        let before = state.methods.len();
        state.methods.retain(|method| method.id != method_id);
        if state.methods.len() == before {
            return Err(ReconcileError::Validation(format!(
                "Method '{}' does not exist",
                method_id
            )));
        }
        Ok(())
    }

    async fn append_history(&self, entry: &HistoryEntry) -> ReconcileResult<()> {
        self.write()?.history.push(entry.clone());
        Ok(())
    }

    async fn list_history(&self, task_id: &str) -> ReconcileResult<Vec<HistoryEntry>> {
        Ok(self
            .read()?
            .history
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn post_message(&self, message: &TaskMessage) -> ReconcileResult<()> {
        self.write()?.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, task_id: &str) -> ReconcileResult<Vec<TaskMessage>> {
        Ok(self
            .read()?
            .messages
            .iter()
            .filter(|message| message.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn get_account(&self, account_id: &str) -> ReconcileResult<Option<LedgerAccount>> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }

    async fn get_company(&self, company_id: &str) -> ReconcileResult<Option<Company>> {
        Ok(self.read()?.companies.get(company_id).cloned())
    }

    async fn get_move_line(&self, line_id: MoveLineId) -> ReconcileResult<Option<MoveLine>> {
        Ok(self.read()?.move_lines.get(&line_id).cloned())
    }

    async fn search_move_lines(&self, query: &LineQuery) -> ReconcileResult<Vec<MoveLine>> {
        Ok(self
            .read()?
            .move_lines
            .values()
            .filter(|line| query.matches(line))
            .cloned()
            .collect())
    }

    async fn lines_in_groups(
        &self,
        kind: ReconcileKind,
        group_ids: &[ReconcileGroupId],
    ) -> ReconcileResult<Vec<MoveLine>> {
        Ok(self
            .read()?
            .move_lines
            .values()
            .filter(|line| line.group(kind).is_some_and(|group| group_ids.contains(&group)))
            .cloned()
            .collect())
    }

    async fn find_reconcile_ids(
        &self,
        kind: ReconcileKind,
        line_ids: &[MoveLineId],
    ) -> ReconcileResult<Vec<ReconcileGroupId>> {
        let state = self.read()?;
        let groups: BTreeSet<ReconcileGroupId> = line_ids
            .iter()
            .filter_map(|id| state.move_lines.get(id))
            .filter_map(|line| line.group(kind))
            .collect();
        Ok(groups.into_iter().collect())
    }

    async fn create_reconciliation(
        &self,
        kind: ReconcileKind,
        line_ids: &[MoveLineId],
    ) -> ReconcileResult<ReconcileGroupId> {
        let mut state = self.write()?;
        if line_ids.is_empty() {
            return Err(ReconcileError::Validation(
                "Cannot reconcile an empty set of lines".to_string(),
            ));
        }
        if let Some(missing) = line_ids
            .iter()
            .find(|id| !state.move_lines.contains_key(*id))
        {
            return Err(ReconcileError::Storage(format!(
                "Move line {} not found",
                missing
            )));
        }

        state.last_group_id += 1;
        let group_id = state.last_group_id;
        for id in line_ids {
            if let Some(line) = state.move_lines.get_mut(id) {
                match kind {
                    ReconcileKind::Full => {
                        line.reconcile_id = Some(group_id);
                        line.reconcile_partial_id = None;
                    }
                    ReconcileKind::Partial => line.reconcile_partial_id = Some(group_id),
                }
            }
        }
        Ok(group_id)
    }

    async fn get_invoice(&self, invoice_id: &str) -> ReconcileResult<Option<Invoice>> {
        Ok(self.read()?.invoices.get(invoice_id).cloned())
    }

    async fn begin_independent(&self) -> ReconcileResult<Self> {
        self.record_transaction(|stats| stats.opened += 1);
        Ok(Self {
            state: Arc::clone(&self.state),
            transactions: Arc::clone(&self.transactions),
            independent: true,
        })
    }

    fn commit(&self) -> ReconcileResult<()> {
        // The caller's own context is committed by the caller
        if self.independent {
            self.record_transaction(|stats| stats.committed += 1);
        }
        Ok(())
    }

    fn close(&self) {
        if self.independent {
            self.record_transaction(|stats| stats.closed += 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn line(id: MoveLineId, period: &str) -> MoveLine {
        MoveLine::new(
            id,
            "411000".to_string(),
            Some(period.to_string()),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            format!("Line {}", id),
            BigDecimal::from(100),
            BigDecimal::from(0),
        )
    }

    #[tokio::test]
    async fn test_full_reconciliation_clears_partial_group() {
        let storage = MemoryStorage::new();
        storage.insert_move_line(line(1, "2024-01")).unwrap();
        storage.insert_move_line(line(2, "2024-01")).unwrap();

        let partial = storage
            .create_reconciliation(ReconcileKind::Partial, &[1, 2])
            .await
            .unwrap();
        let full = storage
            .create_reconciliation(ReconcileKind::Full, &[1])
            .await
            .unwrap();

        assert_ne!(partial, full);
        let first = storage.get_move_line(1).await.unwrap().unwrap();
        assert_eq!(first.reconcile_id, Some(full));
        assert_eq!(first.reconcile_partial_id, None);
        let second = storage.get_move_line(2).await.unwrap().unwrap();
        assert_eq!(second.reconcile_partial_id, Some(partial));
    }

    #[tokio::test]
    async fn test_find_reconcile_ids_is_distinct_and_skips_null() {
        let storage = MemoryStorage::new();
        for id in 1..=4 {
            storage.insert_move_line(line(id, "2024-01")).unwrap();
        }
        let group = storage
            .create_reconciliation(ReconcileKind::Full, &[1, 2])
            .await
            .unwrap();

        let ids = storage
            .find_reconcile_ids(ReconcileKind::Full, &[1, 2, 3, 99])
            .await
            .unwrap();
        assert_eq!(ids, vec![group]);
        assert!(storage
            .find_reconcile_ids(ReconcileKind::Partial, &[1, 2, 3])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_period_and_state() {
        let storage = MemoryStorage::new();
        storage.insert_move_line(line(1, "2024-01")).unwrap();
        storage.insert_move_line(line(2, "2024-02")).unwrap();
        storage.insert_move_line(line(3, "2024-02")).unwrap();
        storage
            .create_reconciliation(ReconcileKind::Partial, &[3])
            .await
            .unwrap();

        let query = LineQuery {
            account_id: "411000".to_string(),
            period_id: Some("2024-02".to_string()),
            state: ReconcileState::Unreconciled,
        };
        let found = storage.search_move_lines(&query).await.unwrap();
        assert_eq!(found.iter().map(|l| l.id).collect::<Vec<_>>(), vec![2]);

        let query = LineQuery {
            period_id: None,
            ..query
        };
        assert_eq!(storage.count_move_lines(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_independent_context_is_counted() {
        let storage = MemoryStorage::new();
        storage.commit().unwrap();
        storage.close();
        assert_eq!(storage.transaction_stats(), TransactionStats::default());

        let independent = storage.begin_independent().await.unwrap();
        assert!(independent.is_independent());
        independent.commit().unwrap();
        independent.close();

        let stats = storage.transaction_stats();
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.closed, 1);
    }
}
