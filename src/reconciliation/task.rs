//! Reconcile task configuration

use crate::traits::*;
use crate::types::*;

/// Task manager for creating and editing reconcile tasks and their methods
pub struct TaskManager<S: ReconcileStorage> {
    pub(crate) storage: S,
    validator: Box<dyn TaskValidator>,
}

impl<S: ReconcileStorage> TaskManager<S> {
    /// Create a new task manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultTaskValidator),
        }
    }

    /// Create a new task manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn TaskValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new reconcile task on an account
    ///
    /// When no company is given the task takes the account's company.
    pub async fn create_task(
        &self,
        name: String,
        account_id: String,
        period_id: Option<String>,
        company_id: Option<String>,
    ) -> ReconcileResult<ReconcileTask> {
        let mut task = ReconcileTask::new(name, account_id, period_id, company_id);
        self.validator.validate_task(&task)?;

        let account = self
            .storage
            .get_account(&task.account_id)
            .await?
            .ok_or_else(|| ReconcileError::AccountNotFound(task.account_id.clone()))?;
        if task.company_id.is_none() {
            task.company_id = account.company_id;
        }

        self.storage.save_task(&task).await?;
        tracing::debug!(task = %task.name, account = %task.account_id, "created reconcile task");

        Ok(task)
    }

    /// Get a task by ID
    pub async fn get_task(&self, task_id: &str) -> ReconcileResult<Option<ReconcileTask>> {
        self.storage.get_task(task_id).await
    }

    /// Get a task by ID, returning an error if not found
    pub async fn get_task_required(&self, task_id: &str) -> ReconcileResult<ReconcileTask> {
        self.storage
            .get_task(task_id)
            .await?
            .ok_or_else(|| ReconcileError::TaskNotFound(task_id.to_string()))
    }

    /// List all tasks
    pub async fn list_tasks(&self) -> ReconcileResult<Vec<ReconcileTask>> {
        self.storage.list_tasks().await
    }

    /// Update a task; its methods follow the task's company
    pub async fn update_task(&self, task: &ReconcileTask) -> ReconcileResult<()> {
        self.validator.validate_task(task)?;

        if self.storage.get_account(&task.account_id).await?.is_none() {
            return Err(ReconcileError::AccountNotFound(task.account_id.clone()));
        }
        self.get_task_required(&task.id).await?;

        let mut task = task.clone();
        task.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_task(&task).await?;

        for mut method in self.storage.list_methods(&task.id).await? {
            if method.company_id != task.company_id {
                method.company_id = task.company_id.clone();
                self.storage.save_method(&method).await?;
            }
        }

        Ok(())
    }

    /// Delete a task together with its methods
    pub async fn delete_task(&self, task_id: &str) -> ReconcileResult<()> {
        self.get_task_required(task_id).await?;

        for method in self.storage.list_methods(task_id).await? {
            self.storage.delete_method(&method.id).await?;
        }

        self.storage.delete_task(task_id).await
    }

    /// Add a reconciliation method to a task
    pub async fn add_method(
        &self,
        task_id: &str,
        kind: StrategyKind,
        sequence: i32,
        options: ReconcileOptions,
    ) -> ReconcileResult<MethodConfig> {
        self.validator.validate_options(&options)?;
        let task = self.get_task_required(task_id).await?;

        let method = MethodConfig::new(&task, kind, sequence, options);
        self.storage.save_method(&method).await?;

        Ok(method)
    }

    /// Change the options of an existing method
    pub async fn update_method(&self, method: &MethodConfig) -> ReconcileResult<()> {
        self.validator.validate_options(&method.options)?;
        let task = self.get_task_required(&method.task_id).await?;

        let mut method = method.clone();
        method.company_id = task.company_id;
        self.storage.save_method(&method).await
    }

    /// Remove one method from its task
    pub async fn remove_method(&self, method_id: &str) -> ReconcileResult<()> {
        self.storage.delete_method(method_id).await
    }

    /// Methods of a task in execution order
    pub async fn methods_for(&self, task_id: &str) -> ReconcileResult<Vec<MethodConfig>> {
        ordered_methods(&self.storage, task_id).await
    }
}

/// Methods of a task sorted by ascending sequence, insertion order on ties
pub async fn ordered_methods<S: ReconcileStorage>(
    storage: &S,
    task_id: &str,
) -> ReconcileResult<Vec<MethodConfig>> {
    let mut methods = storage.list_methods(task_id).await?;
    methods.sort_by_key(|method| method.sequence);
    Ok(methods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn storage_with_account() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage
            .insert_account(LedgerAccount {
                id: "411000".to_string(),
                name: "Customers".to_string(),
                company_id: Some("main".to_string()),
            })
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_create_task_takes_account_company() {
        let manager = TaskManager::new(storage_with_account());

        let task = manager
            .create_task("Customers".to_string(), "411000".to_string(), None, None)
            .await
            .unwrap();

        assert_eq!(task.company_id.as_deref(), Some("main"));
        assert!(manager.get_task(&task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_task_requires_existing_account() {
        let manager = TaskManager::new(storage_with_account());

        let result = manager
            .create_task("Suppliers".to_string(), "401000".to_string(), None, None)
            .await;

        assert!(matches!(result, Err(ReconcileError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_methods_sorted_by_sequence() {
        let manager = TaskManager::new(storage_with_account());
        let task = manager
            .create_task("Customers".to_string(), "411000".to_string(), None, None)
            .await
            .unwrap();

        let reference = manager
            .add_method(&task.id, StrategyKind::SimpleReference, 20, ReconcileOptions::default())
            .await
            .unwrap();
        let name = manager
            .add_method(&task.id, StrategyKind::SimpleName, 5, ReconcileOptions::default())
            .await
            .unwrap();
        let partner = manager
            .add_method(&task.id, StrategyKind::SimplePartner, 20, ReconcileOptions::default())
            .await
            .unwrap();

        let ids: Vec<String> = manager
            .methods_for(&task.id)
            .await
            .unwrap()
            .into_iter()
            .map(|method| method.id)
            .collect();
        assert_eq!(ids, vec![name.id, reference.id, partner.id]);
    }

    #[tokio::test]
    async fn test_delete_task_cascades_to_methods() {
        let storage = storage_with_account();
        let manager = TaskManager::new(storage.clone());
        let task = manager
            .create_task("Customers".to_string(), "411000".to_string(), None, None)
            .await
            .unwrap();
        manager
            .add_method(&task.id, StrategyKind::SimpleName, 1, ReconcileOptions::default())
            .await
            .unwrap();

        manager.delete_task(&task.id).await.unwrap();

        assert!(storage.list_methods(&task.id).await.unwrap().is_empty());
        assert!(storage.get_task(&task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_task_moves_methods_to_new_company() {
        let storage = storage_with_account();
        let manager = TaskManager::new(storage.clone());
        let mut task = manager
            .create_task(
                "Customers".to_string(),
                "411000".to_string(),
                None,
                Some("a".to_string()),
            )
            .await
            .unwrap();
        for (kind, sequence) in [(StrategyKind::SimpleName, 1), (StrategyKind::SimplePartner, 2)] {
            manager
                .add_method(&task.id, kind, sequence, ReconcileOptions::default())
                .await
                .unwrap();
        }

        task.company_id = Some("b".to_string());
        manager.update_task(&task).await.unwrap();

        let stored = manager.get_task_required(&task.id).await.unwrap();
        assert_eq!(stored.company_id.as_deref(), Some("b"));
        let methods = manager.methods_for(&task.id).await.unwrap();
        assert_eq!(methods.len(), 2);
        assert!(methods
            .iter()
            .all(|method| method.company_id.as_deref() == Some("b")));
    }

    #[tokio::test]
    async fn test_update_method_validates_and_keeps_task_company() {
        let manager = TaskManager::new(storage_with_account());
        let task = manager
            .create_task("Customers".to_string(), "411000".to_string(), None, None)
            .await
            .unwrap();
        let method = manager
            .add_method(&task.id, StrategyKind::SimpleName, 1, ReconcileOptions::default())
            .await
            .unwrap();

        let mut negative = method.clone();
        negative.options.write_off = bigdecimal::BigDecimal::from(-5);
        let result = manager.update_method(&negative).await;
        assert!(matches!(result, Err(ReconcileError::Validation(_))));

        let mut changed = method.clone();
        changed.company_id = Some("other".to_string());
        changed.sequence = 7;
        manager.update_method(&changed).await.unwrap();

        let methods = manager.methods_for(&task.id).await.unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].sequence, 7);
        assert_eq!(methods[0].company_id.as_deref(), Some("main"));
        assert_eq!(methods[0].options.write_off, bigdecimal::BigDecimal::from(0));
    }

    #[tokio::test]
    async fn test_negative_write_off_rejected() {
        let manager = TaskManager::new(storage_with_account());
        let task = manager
            .create_task("Customers".to_string(), "411000".to_string(), None, None)
            .await
            .unwrap();

        let options = ReconcileOptions {
            write_off: bigdecimal::BigDecimal::from(-1),
            ..ReconcileOptions::default()
        };
        let result = manager
            .add_method(&task.id, StrategyKind::SimpleName, 1, options)
            .await;

        assert!(matches!(result, Err(ReconcileError::Validation(_))));
    }
}
