//! Turning approved purchase request lines into a request for quotation

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Approval state of a purchase request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Draft,
    ToApprove,
    Approved,
    Rejected,
}

/// A purchase request raised by an employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: String,
    pub name: String,
    pub requested_by: String,
    pub state: RequestState,
    pub lines: Vec<PurchaseRequestLine>,
}

/// One requested product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequestLine {
    pub id: String,
    pub request_id: String,
    /// Free-text lines have no product
    pub product_id: Option<String>,
    pub name: String,
    pub product_qty: BigDecimal,
    pub product_uom: String,
    pub date_required: NaiveDate,
    pub analytic_account_id: Option<String>,
    /// Purchase order lines created from this request line
    pub purchase_line_ids: Vec<String>,
}

impl PurchaseRequestLine {
    pub fn new(
        request_id: String,
        product_id: Option<String>,
        name: String,
        product_qty: BigDecimal,
        product_uom: String,
        date_required: NaiveDate,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            product_id,
            name,
            product_qty,
            product_uom,
            date_required,
            analytic_account_id: None,
            purchase_line_ids: Vec::new(),
        }
    }
}

/// State of a purchase order; a draft order is an RFQ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Draft,
    Sent,
    Confirmed,
    Cancelled,
}

/// Purchase order sent to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,
    pub supplier_id: String,
    pub state: OrderState,
    pub date_order: NaiveDateTime,
    pub lines: Vec<PurchaseOrderLine>,
}

impl PurchaseOrder {
    /// Create an empty request for quotation
    pub fn new_rfq(supplier_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            supplier_id,
            state: OrderState::Draft,
            date_order: chrono::Utc::now().naive_utc(),
            lines: Vec::new(),
        }
    }

    /// Total ordered quantity of a product
    pub fn quantity_of(&self, product_id: &str) -> BigDecimal {
        self.lines
            .iter()
            .filter(|line| line.product_id.as_deref() == Some(product_id))
            .map(|line| &line.product_qty)
            .sum()
    }
}

/// Line of a purchase order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub product_qty: BigDecimal,
    pub product_uom: String,
    pub date_planned: NaiveDate,
    pub analytic_account_id: Option<String>,
    /// Request lines sourced by this order line
    pub request_line_ids: Vec<String>,
}

impl PurchaseOrderLine {
    fn from_request_line(line: &PurchaseRequestLine) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            product_qty: line.product_qty.clone(),
            product_uom: line.product_uom.clone(),
            date_planned: line.date_required,
            analytic_account_id: line.analytic_account_id.clone(),
            request_line_ids: vec![line.id.clone()],
        }
    }

    /// Whether a request line can be added to this order line
    fn accepts(&self, line: &PurchaseRequestLine) -> bool {
        self.product_id.is_some()
            && self.product_id == line.product_id
            && self.product_uom == line.product_uom
            && self.analytic_account_id == line.analytic_account_id
    }
}

/// Result of [`RfqBuilder::build`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfqOutcome {
    pub order: PurchaseOrder,
    /// Request lines linked to their purchase order lines
    pub request_lines: Vec<PurchaseRequestLine>,
}

/// Builds or extends an RFQ from purchase request lines
#[derive(Debug, Clone)]
pub struct RfqBuilder {
    supplier_id: String,
    order: Option<PurchaseOrder>,
    items: Vec<(RequestState, String, PurchaseRequestLine)>,
}

impl RfqBuilder {
    /// Start an RFQ for a supplier
    pub fn new(supplier_id: String) -> Self {
        Self {
            supplier_id,
            order: None,
            items: Vec::new(),
        }
    }

    /// Add the lines to an existing RFQ instead of a new one
    pub fn into_order(mut self, order: PurchaseOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Add one line of a request
    pub fn add_line(mut self, request: &PurchaseRequest, line: &PurchaseRequestLine) -> Self {
        self.items
            .push((request.state, request.name.clone(), line.clone()));
        self
    }

    /// Add every line of a request
    pub fn add_request(self, request: &PurchaseRequest) -> Self {
        request
            .lines
            .iter()
            .fold(self, |builder, line| builder.add_line(request, line))
    }

    /// Build the RFQ
    pub fn build(self) -> Result<RfqOutcome, PurchaseError> {
        if self.items.is_empty() {
            return Err(PurchaseError::NoLines);
        }

        let mut order = match self.order {
            Some(order) => {
                if order.state != OrderState::Draft {
                    return Err(PurchaseError::OrderNotDraft(order.id));
                }
                if order.supplier_id != self.supplier_id {
                    return Err(PurchaseError::SupplierMismatch {
                        expected: self.supplier_id,
                        found: order.supplier_id,
                    });
                }
                order
            }
            None => PurchaseOrder::new_rfq(self.supplier_id),
        };

        let mut request_lines = Vec::with_capacity(self.items.len());
        for (state, request_name, mut line) in self.items {
            if state != RequestState::Approved {
                return Err(PurchaseError::RequestNotApproved(request_name));
            }
            if line.product_qty <= BigDecimal::from(0) {
                return Err(PurchaseError::InvalidQuantity(line.name));
            }
            // Already sourced by this order
            if order
                .lines
                .iter()
                .any(|existing| existing.request_line_ids.contains(&line.id))
            {
                tracing::debug!(request_line = %line.id, "request line already on the RFQ");
                continue;
            }

            let order_line_id = match order.lines.iter_mut().find(|existing| existing.accepts(&line)) {
                Some(existing) => {
                    existing.product_qty += &line.product_qty;
                    existing.date_planned = existing.date_planned.min(line.date_required);
                    existing.request_line_ids.push(line.id.clone());
                    existing.id.clone()
                }
                None => {
                    let new_line = PurchaseOrderLine::from_request_line(&line);
                    let id = new_line.id.clone();
                    order.lines.push(new_line);
                    id
                }
            };

            line.purchase_line_ids.push(order_line_id);
            request_lines.push(line);
        }

        tracing::debug!(
            order = %order.id,
            supplier = %order.supplier_id,
            lines = order.lines.len(),
            "built request for quotation"
        );

        Ok(RfqOutcome {
            order,
            request_lines,
        })
    }
}

/// Purchase workflow errors
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error("No purchase request line to process")]
    NoLines,
    #[error("Purchase request {0} is not approved")]
    RequestNotApproved(String),
    #[error("Purchase order {0} is not a draft RFQ")]
    OrderNotDraft(String),
    #[error("Purchase order is for supplier {found}, expected {expected}")]
    SupplierMismatch { expected: String, found: String },
    #[error("Requested quantity must be positive: {0}")]
    InvalidQuantity(String),
}
