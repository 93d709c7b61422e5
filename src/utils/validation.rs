//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that a write-off tolerance is not negative
pub fn validate_write_off(amount: &BigDecimal) -> ReconcileResult<()> {
    if *amount < BigDecimal::from(0) {
        Err(ReconcileError::Validation(
            "Write-off cannot be negative".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that a task name is valid
pub fn validate_task_name(name: &str) -> ReconcileResult<()> {
    if name.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Task name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(ReconcileError::Validation(
            "Task name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a reference to another record (account, journal, period)
pub fn validate_reference(field: &str, reference: Option<&str>) -> ReconcileResult<()> {
    match reference {
        Some(id) if id.trim().is_empty() => Err(ReconcileError::Validation(format!(
            "{} cannot be an empty reference",
            field
        ))),
        _ => Ok(()),
    }
}

/// Enhanced validator that also checks every optional reference
pub struct EnhancedTaskValidator;

impl TaskValidator for EnhancedTaskValidator {
    fn validate_task(&self, task: &ReconcileTask) -> ReconcileResult<()> {
        validate_task_name(&task.name)?;
        DefaultTaskValidator.validate_task(task)?;
        validate_reference("Period", task.period_id.as_deref())?;
        validate_reference("Company", task.company_id.as_deref())?;
        Ok(())
    }

    fn validate_options(&self, options: &ReconcileOptions) -> ReconcileResult<()> {
        validate_write_off(&options.write_off)?;
        validate_reference("Account Lost", options.account_lost_id.as_deref())?;
        validate_reference("Account Profit", options.account_profit_id.as_deref())?;
        validate_reference("Journal", options.journal_id.as_deref())?;
        validate_reference("Analytic account", options.analytic_account_id.as_deref())?;
        validate_reference(
            "Gain Exchange Rate Account",
            options.income_exchange_account_id.as_deref(),
        )?;
        validate_reference(
            "Loss Exchange Rate Account",
            options.expense_exchange_account_id.as_deref(),
        )?;

        // A tolerated write-off must be postable somewhere
        if options.write_off > BigDecimal::from(0)
            && options.account_lost_id.is_none()
            && options.account_profit_id.is_none()
        {
            return Err(ReconcileError::Validation(
                "A write-off requires a lost or profit account".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_off_validation() {
        assert!(validate_write_off(&BigDecimal::from(0)).is_ok());
        assert!(validate_write_off(&BigDecimal::from(5)).is_ok());
        assert!(validate_write_off(&BigDecimal::from(-1)).is_err());
    }

    #[test]
    fn test_enhanced_validator_requires_write_off_account() {
        let options = ReconcileOptions {
            write_off: BigDecimal::from(1),
            ..ReconcileOptions::default()
        };
        assert!(EnhancedTaskValidator.validate_options(&options).is_err());

        let options = ReconcileOptions {
            write_off: BigDecimal::from(1),
            account_lost_id: Some("658000".to_string()),
            ..ReconcileOptions::default()
        };
        assert!(EnhancedTaskValidator.validate_options(&options).is_ok());
    }

    #[test]
    fn test_enhanced_validator_rejects_blank_period() {
        let task = ReconcileTask::new(
            "Receivables".to_string(),
            "411000".to_string(),
            Some("  ".to_string()),
            None,
        );
        assert!(EnhancedTaskValidator.validate_task(&task).is_err());
    }
}
