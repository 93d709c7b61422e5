//! Scheduled reconciliation example
//!
//! Run with `RUST_LOG=debug cargo run --example easy_reconcile` to see each
//! method as it runs.

use std::collections::BTreeMap;

use accounting_reconcile::utils::MemoryStorage;
use accounting_reconcile::{
    logging, Company, LedgerAccount, LineQuery, MatchOutcome, MatchingStrategy, MoveLine,
    ReconcileKind, ReconcileOptions, ReconcileParams, ReconcileResult, ReconcileState,
    ReconcileStorage, Reconciler, SchedulerConfig, StrategyKind, StrategyRegistry,
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

/// Reconciles open lines sharing a label whose balance is within the write-off
struct SameName;

#[async_trait]
impl MatchingStrategy<MemoryStorage> for SameName {
    async fn automatic_reconcile(
        &self,
        storage: &MemoryStorage,
        params: &ReconcileParams,
    ) -> ReconcileResult<MatchOutcome> {
        let query = LineQuery {
            account_id: params.account_id.clone(),
            period_id: params.period_id.clone(),
            state: ReconcileState::Unreconciled,
        };

        let mut by_name: BTreeMap<String, Vec<MoveLine>> = BTreeMap::new();
        for line in storage.search_move_lines(&query).await? {
            by_name.entry(line.name.clone()).or_default().push(line);
        }

        let mut outcome = MatchOutcome::default();
        for lines in by_name.into_values().filter(|lines| lines.len() > 1) {
            let balance: BigDecimal = lines.iter().map(|line| &line.debit - &line.credit).sum();
            if balance.abs() > params.options.write_off {
                continue;
            }
            let ids: Vec<_> = lines.iter().map(|line| line.id).collect();
            storage
                .create_reconciliation(ReconcileKind::Full, &ids)
                .await?;
            outcome.reconciled.extend(ids);
        }

        Ok(outcome)
    }
}

fn line(id: u64, name: &str, debit: i64, credit: i64) -> MoveLine {
    MoveLine::new(
        id,
        "411000".to_string(),
        Some("2024-03".to_string()),
        NaiveDate::from_ymd_opt(2024, 3, id as u32).unwrap(),
        name.to_string(),
        BigDecimal::from(debit),
        BigDecimal::from(credit),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SchedulerConfig::from_env()?;
    logging::init_with(&config.log_filter);

    println!("🔁 Accounting Reconcile - Easy Reconcile Example\n");

    let storage = MemoryStorage::new();
    storage.insert_company(Company {
        id: "main".to_string(),
        name: "Main Company".to_string(),
        reconciliation_commit_every: Some(100),
    })?;
    storage.insert_account(LedgerAccount {
        id: "411000".to_string(),
        name: "Customers".to_string(),
        company_id: Some("main".to_string()),
    })?;
    storage.insert_move_line(line(1, "INV/2024/0001", 1200, 0))?;
    storage.insert_move_line(line(2, "INV/2024/0001", 0, 1200))?;
    storage.insert_move_line(line(3, "INV/2024/0002", 500, 0))?;
    storage.insert_move_line(line(4, "INV/2024/0002", 0, 499))?;
    storage.insert_move_line(line(5, "INV/2024/0003", 80, 0))?;

    let strategies = StrategyRegistry::new().with(StrategyKind::SimpleName, SameName);
    let reconciler = Reconciler::new(storage.clone(), strategies);

    let task = reconciler
        .create_task(
            "Customers March".to_string(),
            "411000".to_string(),
            Some("2024-03".to_string()),
            None,
        )
        .await?;
    let options = ReconcileOptions {
        write_off: BigDecimal::from(1),
        account_lost_id: Some("658000".to_string()),
        account_profit_id: Some("758000".to_string()),
        ..ReconcileOptions::default()
    };
    reconciler
        .add_method(&task.id, StrategyKind::SimpleName, 10, options)
        .await?;
    println!("  ✓ Created task: {}", task.name);
    println!(
        "  Unreconciled lines before: {}\n",
        reconciler.unreconciled_count(&task.id).await?
    );

    for entry in reconciler.run_scheduler_with(&config).await? {
        println!(
            "  ✓ Run at {}: {} reconciliations, {} partial",
            entry.date,
            entry.reconcile_ids.len(),
            entry.reconcile_partial_ids.len()
        );
    }

    let reconciled = reconciler.last_history_reconcile(&task.id).await?;
    println!("  {}: {:?}", reconciled.name, reconciled.move_line_ids);
    let open = reconciler.open_unreconcile(&task.id).await?;
    println!("  {}: {:?}", open.name, open.move_line_ids);

    let stats = storage.transaction_stats();
    println!(
        "\n  Independent transactions: {} opened, {} committed",
        stats.opened, stats.committed
    );

    Ok(())
}
