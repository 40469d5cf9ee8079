use crate::tools::ledger::{InvoiceStatus, LedgerStore};
use crate::tools::{extract_date_arg, extract_string_arg, extract_string_arg_opt};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};

const INVOICE_FIELDS: &[&str] = &[
    "id",
    "date",
    "amount",
    "status",
    "due_date",
    "currency",
    "customer_name",
    "po_number",
    "terms",
    "notes",
    "items",
    "payment_date",
];

pub struct FindInvoicesTool {
    store: LedgerStore,
}

impl FindInvoicesTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for FindInvoicesTool {
    fn name(&self) -> &str {
        "find_invoices"
    }

    fn description(&self) -> &str {
        "Find invoices whose id contains the given text"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Full invoice id or a fragment of it"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let query = extract_string_arg(&args, "query")?;
        if query.trim().is_empty() {
            return Ok(ToolResult::error("Query must not be empty"));
        }
        let matches = self
            .store
            .read(|l| {
                l.invoices
                    .iter()
                    .filter(|i| i.id.contains(query.trim()))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .await;
        ToolResult::json(&matches)
    }
}

pub struct ValidateInvoiceTool {
    store: LedgerStore,
}

impl ValidateInvoiceTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ValidateInvoiceTool {
    fn name(&self) -> &str {
        "validate_invoice"
    }

    fn description(&self) -> &str {
        "Check an invoice record for unknown ids, unexpected fields and totals that do not add up"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "invoice": {
                    "type": "object",
                    "description": "Invoice record as returned by find_invoices"
                }
            },
            "required": ["invoice"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let Some(invoice) = args.get("invoice").and_then(Value::as_object) else {
            anyhow::bail!("Missing 'invoice' object");
        };

        let mut issues: Vec<String> = invoice
            .keys()
            .filter(|k| !INVOICE_FIELDS.contains(&k.as_str()))
            .map(|k| format!("unexpected field: {k}"))
            .collect();

        match invoice.get("id").and_then(Value::as_str) {
            None => issues.push("missing id".to_string()),
            Some(id) => {
                if !self.store.read(|l| l.invoice(id).is_some()).await {
                    issues.push(format!("unknown invoice id: {id}"));
                }
            }
        }

        if let (Some(amount), Some(items)) = (
            invoice.get("amount").and_then(Value::as_i64),
            invoice.get("items").and_then(Value::as_array),
        ) {
            let total: i64 = items
                .iter()
                .filter_map(|i| i.get("total").and_then(Value::as_i64))
                .sum();
            if total != amount {
                issues.push(format!("items total {total} does not match amount {amount}"));
            }
        }

        ToolResult::json(&json!({ "valid": issues.is_empty(), "issues": issues }))
    }
}

pub struct DetectDuplicateInvoiceTool {
    store: LedgerStore,
}

impl DetectDuplicateInvoiceTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DetectDuplicateInvoiceTool {
    fn name(&self) -> &str {
        "detect_duplicate_invoice"
    }

    fn description(&self) -> &str {
        "Report whether an invoice id is already on the ledger"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "invoice_id": { "type": "string", "description": "Invoice id to check" }
            },
            "required": ["invoice_id"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let id = extract_string_arg(&args, "invoice_id")?;
        let duplicate = self.store.read(|l| l.invoice(&id).is_some()).await;
        ToolResult::json(&json!({ "invoice_id": id, "duplicate": duplicate }))
    }
}

pub struct ComputeInvoiceTotalsTool {
    store: LedgerStore,
}

impl ComputeInvoiceTotalsTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ComputeInvoiceTotalsTool {
    fn name(&self) -> &str {
        "compute_invoice_totals"
    }

    fn description(&self) -> &str {
        "Sum an invoice's line items and compare the result with the invoiced amount"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "invoice_id": { "type": "string", "description": "Invoice id" }
            },
            "required": ["invoice_id"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let id = extract_string_arg(&args, "invoice_id")?;
        let totals = self
            .store
            .read(|l| {
                l.invoice(&id)
                    .map(|i| (i.items_total(), i.amount, i.currency.clone()))
            })
            .await;

        match totals {
            Some((items_total, amount, currency)) => ToolResult::json(&json!({
                "invoice_id": id,
                "items_total": items_total,
                "invoiced_amount": amount,
                "currency": currency,
                "matches": items_total == amount,
            })),
            None => Ok(ToolResult::error(format!("Invoice '{id}' not found"))),
        }
    }
}

pub struct QueryUnpaidInvoicesTool {
    store: LedgerStore,
}

impl QueryUnpaidInvoicesTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for QueryUnpaidInvoicesTool {
    fn name(&self) -> &str {
        "query_unpaid_invoices"
    }

    fn description(&self) -> &str {
        "List unpaid invoices that were due before a date, optionally for one department"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "as_of_date": { "type": "string", "description": "Date in YYYY-MM-DD format" },
                "department": { "type": "string", "description": "Department name (optional)" }
            },
            "required": ["as_of_date"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let as_of = extract_date_arg(&args, "as_of_date")?;
        let department = extract_string_arg_opt(&args, "department", "");

        let result = self
            .store
            .read(|l| {
                let department_id = if department.trim().is_empty() {
                    None
                } else {
                    match l.department_named(&department) {
                        Some(d) => Some(d.id.clone()),
                        None => return Err(format!("Unknown department '{department}'")),
                    }
                };
                Ok(l.invoices
                    .iter()
                    .filter(|i| i.status == InvoiceStatus::Unpaid && i.due_date < as_of)
                    .filter(|i| department_id.as_ref().is_none_or(|d| *d == i.po_number))
                    .cloned()
                    .collect::<Vec<_>>())
            })
            .await;

        match result {
            Ok(invoices) => ToolResult::json(&invoices),
            Err(e) => Ok(ToolResult::error(e)),
        }
    }
}

pub struct UpdatePaymentStatusTool {
    store: LedgerStore,
}

impl UpdatePaymentStatusTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdatePaymentStatusTool {
    fn name(&self) -> &str {
        "update_invoice_payment_status"
    }

    fn description(&self) -> &str {
        "Record a payment status for an invoice. A payment made after the due date is recorded as overdue"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "invoice_id": { "type": "string" },
                "status": { "type": "string", "enum": ["paid", "unpaid", "overdue"] },
                "payment_date": { "type": "string", "description": "Date in YYYY-MM-DD format" }
            },
            "required": ["invoice_id", "status", "payment_date"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let id = extract_string_arg(&args, "invoice_id")?;
        let status: InvoiceStatus = extract_string_arg(&args, "status")?.parse()?;
        let payment_date = extract_date_arg(&args, "payment_date")?;

        let updated = self
            .store
            .write(|l| {
                l.invoice_mut(&id).map(|invoice| {
                    let late = payment_date > invoice.due_date;
                    invoice.status = if status == InvoiceStatus::Paid && late {
                        InvoiceStatus::Overdue
                    } else {
                        status
                    };
                    invoice.payment_date = Some(payment_date);
                    invoice.status
                })
            })
            .await;

        match updated {
            Some(recorded) => ToolResult::json(&json!({ "invoice_id": id, "status": recorded })),
            None => Ok(ToolResult::error(format!("Invoice '{id}' not found"))),
        }
    }
}

pub struct GetPaymentStatusTool {
    store: LedgerStore,
}

impl GetPaymentStatusTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetPaymentStatusTool {
    fn name(&self) -> &str {
        "get_invoice_payment_status"
    }

    fn description(&self) -> &str {
        "Get the payment status of an invoice"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "invoice_id": { "type": "string" }
            },
            "required": ["invoice_id"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let id = extract_string_arg(&args, "invoice_id")?;
        let status = self
            .store
            .read(|l| l.invoice(&id).map(|i| (i.status, i.payment_date)))
            .await;

        match status {
            Some((status, payment_date)) => ToolResult::json(&json!({
                "invoice_id": id,
                "status": status,
                "payment_date": payment_date,
            })),
            None => Ok(ToolResult::error(format!("Invoice '{id}' not found"))),
        }
    }
}
