//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of a ledger move line
pub type MoveLineId = u64;

/// Identifier of a full or partial reconciliation group
pub type ReconcileGroupId = u64;

/// Strategy used by a reconciliation method to match move lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Match on amount and line name
    #[serde(rename = "easy.reconcile.simple.name")]
    SimpleName,
    /// Match on amount and partner
    #[serde(rename = "easy.reconcile.simple.partner")]
    SimplePartner,
    /// Match on amount and reference
    #[serde(rename = "easy.reconcile.simple.reference")]
    SimpleReference,
}

impl StrategyKind {
    /// All strategies a method can be configured with
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::SimpleName,
        StrategyKind::SimplePartner,
        StrategyKind::SimpleReference,
    ];

    /// Technical identifier of the strategy
    pub fn identifier(&self) -> &'static str {
        match self {
            StrategyKind::SimpleName => "easy.reconcile.simple.name",
            StrategyKind::SimplePartner => "easy.reconcile.simple.partner",
            StrategyKind::SimpleReference => "easy.reconcile.simple.reference",
        }
    }

    /// Label shown to users
    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::SimpleName => "Simple. Amount and Name",
            StrategyKind::SimplePartner => "Simple. Amount and Partner",
            StrategyKind::SimpleReference => "Simple. Amount and Reference",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for StrategyKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.identifier() == s)
            .ok_or_else(|| ReconcileError::UnknownStrategy(s.to_string()))
    }
}

/// Which date a reconciliation write-off is dated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    /// End of the period of the most recent credit line
    #[default]
    EndPeriodLastCredit,
    /// Date of the most recent move line
    Newest,
    /// Today
    Actual,
    /// End of the period of the most recent move line
    EndPeriod,
    /// Date of the most recent credit line
    NewestCredit,
    /// Date of the most recent debit line
    NewestDebit,
}

impl DateBasis {
    pub const ALL: [DateBasis; 6] = [
        DateBasis::EndPeriodLastCredit,
        DateBasis::Newest,
        DateBasis::Actual,
        DateBasis::EndPeriod,
        DateBasis::NewestCredit,
        DateBasis::NewestDebit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateBasis::EndPeriodLastCredit => "end_period_last_credit",
            DateBasis::Newest => "newest",
            DateBasis::Actual => "actual",
            DateBasis::EndPeriod => "end_period",
            DateBasis::NewestCredit => "newest_credit",
            DateBasis::NewestDebit => "newest_debit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateBasis::EndPeriodLastCredit => "End of period of most recent credit",
            DateBasis::Newest => "Most recent move line",
            DateBasis::Actual => "Today",
            DateBasis::EndPeriod => "End of period of most recent move line",
            DateBasis::NewestCredit => "Date of most recent credit",
            DateBasis::NewestDebit => "Date of most recent debit",
        }
    }
}

impl FromStr for DateBasis {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateBasis::ALL
            .into_iter()
            .find(|basis| basis.as_str() == s)
            .ok_or_else(|| ReconcileError::Validation(format!("Unknown date basis '{}'", s)))
    }
}

/// Options shared by reconciliation methods and ad-hoc runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Write-off tolerated between matched amounts
    pub write_off: BigDecimal,
    /// Account receiving write-off losses
    pub account_lost_id: Option<String>,
    /// Account receiving write-off profits
    pub account_profit_id: Option<String>,
    /// Journal used for write-off moves
    pub journal_id: Option<String>,
    /// Date the write-off is dated against
    pub date_base_on: DateBasis,
    /// Optional extra filter on candidate move lines
    pub filter: Option<String>,
    /// Analytic account for the write-off
    pub analytic_account_id: Option<String>,
    /// Gain exchange rate account
    pub income_exchange_account_id: Option<String>,
    /// Loss exchange rate account
    pub expense_exchange_account_id: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            write_off: BigDecimal::from(0),
            account_lost_id: None,
            account_profit_id: None,
            journal_id: None,
            date_base_on: DateBasis::default(),
            filter: None,
            analytic_account_id: None,
            income_exchange_account_id: None,
            expense_exchange_account_id: None,
        }
    }
}

/// A reconciliation task: one account, an optional period and ordered methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileTask {
    pub id: String,
    pub name: String,
    /// Account whose lines are reconciled
    pub account_id: String,
    /// Restricts candidate lines to one period when set
    pub period_id: Option<String>,
    pub company_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ReconcileTask {
    /// Create a new task with a generated identifier
    pub fn new(
        name: String,
        account_id: String,
        period_id: Option<String>,
        company_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            account_id,
            period_id,
            company_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One configured reconciliation method of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    pub id: String,
    /// Owning task; the method is deleted with it
    pub task_id: String,
    pub kind: StrategyKind,
    /// Lower sequences run first
    pub sequence: i32,
    /// Copied from the owning task
    pub company_id: Option<String>,
    #[serde(flatten)]
    pub options: ReconcileOptions,
}

impl MethodConfig {
    pub fn new(task: &ReconcileTask, kind: StrategyKind, sequence: i32, options: ReconcileOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task.id.clone(),
            kind,
            sequence,
            company_id: task.company_id.clone(),
            options,
        }
    }
}

/// Outcome of one task run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub task_id: String,
    pub date: NaiveDateTime,
    /// Full reconciliation groups created or touched by the run
    pub reconcile_ids: BTreeSet<ReconcileGroupId>,
    /// Partial reconciliation groups created or touched by the run
    pub reconcile_partial_ids: BTreeSet<ReconcileGroupId>,
}

impl HistoryEntry {
    pub fn new(
        task_id: String,
        date: NaiveDateTime,
        reconcile_ids: BTreeSet<ReconcileGroupId>,
        reconcile_partial_ids: BTreeSet<ReconcileGroupId>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id,
            date,
            reconcile_ids,
            reconcile_partial_ids,
        }
    }

    /// Entry recorded when a run failed
    pub fn empty(task_id: String, date: NaiveDateTime) -> Self {
        Self::new(task_id, date, BTreeSet::new(), BTreeSet::new())
    }

    pub fn is_empty(&self) -> bool {
        self.reconcile_ids.is_empty() && self.reconcile_partial_ids.is_empty()
    }
}

/// Operator-visible message attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub task_id: String,
    pub date: NaiveDateTime,
    pub body: String,
}

/// Company owning ledger accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Commit reconciliations in batches of this size, in a separate transaction
    pub reconciliation_commit_every: Option<u32>,
}

/// Ledger account as seen by the reconciliation tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: String,
    pub name: String,
    pub company_id: Option<String>,
}

/// Full or partial reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileKind {
    Full,
    Partial,
}

/// A single ledger move line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLine {
    pub id: MoveLineId,
    pub account_id: String,
    pub period_id: Option<String>,
    pub date: NaiveDate,
    pub name: String,
    pub reference: Option<String>,
    pub partner_id: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Full reconciliation group
    pub reconcile_id: Option<ReconcileGroupId>,
    /// Partial reconciliation group
    pub reconcile_partial_id: Option<ReconcileGroupId>,
    pub invoice_id: Option<String>,
}

impl MoveLine {
    /// Create an unreconciled line
    pub fn new(
        id: MoveLineId,
        account_id: String,
        period_id: Option<String>,
        date: NaiveDate,
        name: String,
        debit: BigDecimal,
        credit: BigDecimal,
    ) -> Self {
        Self {
            id,
            account_id,
            period_id,
            date,
            name,
            reference: None,
            partner_id: None,
            debit,
            credit,
            reconcile_id: None,
            reconcile_partial_id: None,
            invoice_id: None,
        }
    }

    /// Group id of the given kind, if any
    pub fn group(&self, kind: ReconcileKind) -> Option<ReconcileGroupId> {
        match kind {
            ReconcileKind::Full => self.reconcile_id,
            ReconcileKind::Partial => self.reconcile_partial_id,
        }
    }

    pub fn reconcile_state(&self) -> ReconcileState {
        match (self.reconcile_id, self.reconcile_partial_id) {
            (Some(_), _) => ReconcileState::Reconciled,
            (None, Some(_)) => ReconcileState::PartiallyReconciled,
            (None, None) => ReconcileState::Unreconciled,
        }
    }
}

/// Reconciliation state of a move line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    /// No full and no partial group
    Unreconciled,
    /// No full group but a partial group
    PartiallyReconciled,
    /// In a full group
    Reconciled,
}

/// Search criteria over move lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineQuery {
    pub account_id: String,
    /// No restriction when `None`
    pub period_id: Option<String>,
    pub state: ReconcileState,
}

impl LineQuery {
    pub fn matches(&self, line: &MoveLine) -> bool {
        line.account_id == self.account_id
            && self
                .period_id
                .as_ref()
                .is_none_or(|period| line.period_id.as_ref() == Some(period))
            && line.reconcile_state() == self.state
    }
}

/// Customer or supplier invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub number: Option<String>,
    /// Number printed on the supplier's own invoice
    pub supplier_invoice_number: Option<String>,
}

/// A list of move lines to open for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveLineAction {
    pub name: String,
    pub move_line_ids: Vec<MoveLineId>,
}

impl MoveLineAction {
    pub fn new(name: impl Into<String>, move_line_ids: Vec<MoveLineId>) -> Self {
        Self {
            name: name.into(),
            move_line_ids,
        }
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Precondition(String),
    #[error("There is no history of reconciled items on the task: {task}.")]
    NoHistory { task: String },
    #[error("Strategy error: {0}")]
    Strategy(String),
    #[error("No matching strategy registered for {0}")]
    UnknownStrategy(String),
    #[error("Reconcile task not found: {0}")]
    TaskNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_identifiers() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.identifier().parse::<StrategyKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.identifier());

            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.identifier()));
            assert_eq!(serde_json::from_str::<StrategyKind>(&json).unwrap(), kind);
        }
        assert_eq!(
            StrategyKind::SimpleName.identifier(),
            "easy.reconcile.simple.name"
        );
        assert!(matches!(
            "bogus".parse::<StrategyKind>(),
            Err(ReconcileError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_date_basis_identifiers() {
        for basis in DateBasis::ALL {
            assert_eq!(basis.as_str().parse::<DateBasis>().unwrap(), basis);

            let json = serde_json::to_string(&basis).unwrap();
            assert_eq!(json, format!("\"{}\"", basis.as_str()));
            assert_eq!(serde_json::from_str::<DateBasis>(&json).unwrap(), basis);
        }
        assert_eq!(DateBasis::default().as_str(), "end_period_last_credit");
        assert!(matches!(
            "bogus".parse::<DateBasis>(),
            Err(ReconcileError::Validation(_))
        ));
        assert!(serde_json::from_str::<DateBasis>("\"bogus\"").is_err());
    }
}
