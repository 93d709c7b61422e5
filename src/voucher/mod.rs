//! Payment voucher lines showing the supplier's own invoice number
//!
//! When paying a supplier, each voucher line points to the payable move line
//! it settles. The number printed on the supplier's invoice is looked up from
//! that line's invoice and kept on the voucher line.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::traits::*;
use crate::types::*;

/// Supplier invoice number of a move line's invoice, or an empty string
pub async fn supplier_invoice_number<S: ReconcileStorage>(
    storage: &S,
    move_line_id: MoveLineId,
) -> ReconcileResult<String> {
    let Some(invoice_id) = storage
        .get_move_line(move_line_id)
        .await?
        .and_then(|line| line.invoice_id)
    else {
        return Ok(String::new());
    };

    Ok(storage
        .get_invoice(&invoice_id)
        .await?
        .and_then(|invoice| invoice.supplier_invoice_number)
        .unwrap_or_default())
}

/// A line of a payment voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherLine {
    pub id: String,
    pub voucher_id: String,
    /// Move line settled by this voucher line
    pub move_line_id: Option<MoveLineId>,
    pub amount: BigDecimal,
    /// Stored result of [`VoucherLine::compute_supplier_invoice_number`]
    pub supplier_invoice_number: Option<String>,
}

impl VoucherLine {
    /// Create a new voucher line; call [`VoucherLine::compute_supplier_invoice_number`] to fill the number
    pub fn new(voucher_id: String, move_line_id: Option<MoveLineId>, amount: BigDecimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            voucher_id,
            move_line_id,
            amount,
            supplier_invoice_number: None,
        }
    }

    /// Refresh the stored supplier invoice number
    ///
    /// Lines without a move line keep their current value.
    pub async fn compute_supplier_invoice_number<S: ReconcileStorage>(
        &mut self,
        storage: &S,
    ) -> ReconcileResult<()> {
        if let Some(move_line_id) = self.move_line_id {
            self.supplier_invoice_number =
                Some(supplier_invoice_number(storage, move_line_id).await?);
        }
        Ok(())
    }

    /// Point the line to another move line and recompute
    pub async fn set_move_line<S: ReconcileStorage>(
        &mut self,
        storage: &S,
        move_line_id: Option<MoveLineId>,
    ) -> ReconcileResult<()> {
        self.move_line_id = move_line_id;
        self.compute_supplier_invoice_number(storage).await
    }

    /// Change the paid amount and recompute
    pub async fn set_amount<S: ReconcileStorage>(
        &mut self,
        storage: &S,
        amount: BigDecimal,
    ) -> ReconcileResult<()> {
        self.amount = amount;
        self.compute_supplier_invoice_number(storage).await
    }

    /// Move the line to another voucher and recompute
    pub async fn set_voucher<S: ReconcileStorage>(
        &mut self,
        storage: &S,
        voucher_id: String,
    ) -> ReconcileResult<()> {
        self.voucher_id = voucher_id;
        self.compute_supplier_invoice_number(storage).await
    }
}
