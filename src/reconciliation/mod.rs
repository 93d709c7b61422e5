//! Automated reconciliation of ledger lines
//!
//! A [`ReconcileTask`](crate::types::ReconcileTask) binds an account (and
//! optionally a period) to an ordered list of methods. Running it calls each
//! method's matching strategy, then records which reconciliation groups the
//! touched lines ended up in as one history entry.

pub mod history;
pub mod reconciler;
pub mod scheduler;
pub mod strategy;
pub mod task;
pub mod transaction;

pub use reconciler::*;
pub use strategy::*;
pub use task::*;
pub use transaction::*;
