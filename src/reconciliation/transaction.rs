//! Independent transactional context for batched commits

use crate::traits::*;
use crate::types::*;

/// Transactional context owned by a single task run
///
/// The context is committed and released exactly once: by [`finish`] on the
/// normal path, or on drop when the run returns early or unwinds.
///
/// [`finish`]: IndependentTransaction::finish
pub struct IndependentTransaction<S: ReconcileStorage> {
    storage: S,
    released: bool,
}

impl<S: ReconcileStorage> IndependentTransaction<S> {
    /// Open a context independent of `parent`
    pub async fn begin(parent: &S) -> ReconcileResult<Self> {
        let storage = parent.begin_independent().await?;
        tracing::debug!("opened independent reconcile transaction");
        Ok(Self {
            storage,
            released: false,
        })
    }

    /// Storage handle bound to this context
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Commit and release the context
    pub fn finish(mut self) -> ReconcileResult<()> {
        self.release()
    }

    fn release(&mut self) -> ReconcileResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let committed = self.storage.commit();
        self.storage.close();
        committed
    }
}

impl<S: ReconcileStorage> Drop for IndependentTransaction<S> {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            tracing::error!(%error, "failed to commit independent reconcile transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    #[tokio::test]
    async fn test_finish_commits_once() {
        let storage = MemoryStorage::new();
        let transaction = IndependentTransaction::begin(&storage).await.unwrap();
        assert!(transaction.storage().is_independent());

        transaction.finish().unwrap();

        let stats = storage.transaction_stats();
        assert_eq!((stats.opened, stats.committed, stats.closed), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_drop_commits_and_releases() {
        let storage = MemoryStorage::new();
        {
            let _transaction = IndependentTransaction::begin(&storage).await.unwrap();
        }

        let stats = storage.transaction_stats();
        assert_eq!((stats.opened, stats.committed, stats.closed), (1, 1, 1));
    }
}
