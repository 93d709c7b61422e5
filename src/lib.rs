//! # Accounting Reconcile
//!
//! Accounting extensions around an ERP ledger: automated reconciliation of
//! ledger lines, supplier invoice numbers on payment vouchers, and turning
//! purchase requests into requests for quotation.
//!
//! ## Features
//!
//! - **Reconcile tasks**: an account, an optional period and an ordered list of matching methods
//! - **Scheduler**: runs the least recently reconciled task, or all of them
//! - **History**: one entry per run with the full and partial reconciliation groups it produced
//! - **Batched commits**: runs in their own transactional context when the company asks for it
//! - **Supplier invoice number**: looked up from the invoice of the paid move line
//! - **Purchase request to RFQ**: merge approved request lines into a draft purchase order
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use accounting_reconcile::utils::MemoryStorage;
//! use accounting_reconcile::{Reconciler, StrategyRegistry};
//!
//! // Register a MatchingStrategy per StrategyKind, then create tasks and run
//! // them with `run_reconcile` or `run_scheduler`.
//! let storage = MemoryStorage::new();
//! let reconciler = Reconciler::new(storage, StrategyRegistry::new());
//! # let _ = reconciler;
//! ```

pub mod config;
pub mod logging;
pub mod purchasing;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;
pub mod voucher;

// Re-export commonly used types
pub use config::SchedulerConfig;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
pub use voucher::{supplier_invoice_number, VoucherLine};
