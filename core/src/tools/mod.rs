use crate::agent::ToolRegistry;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

pub mod calculator;
pub mod directory;
pub mod invoices;
pub mod ledger;

pub use calculator::CalculatorTool;
pub use directory::{CrossReferencePoTool, PeopleDirectoryTool, SendNotificationTool};
pub use invoices::{
    ComputeInvoiceTotalsTool, DetectDuplicateInvoiceTool, FindInvoicesTool, GetPaymentStatusTool,
    QueryUnpaidInvoicesTool, UpdatePaymentStatusTool, ValidateInvoiceTool,
};
pub use ledger::{Invoice, InvoiceStatus, Ledger, LedgerStore};

/// Registry with every bundled tool, all sharing `store`.
pub fn default_registry(store: LedgerStore) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Arc::new(FindInvoicesTool::new(store.clone())))
        .with_tool(Arc::new(ValidateInvoiceTool::new(store.clone())))
        .with_tool(Arc::new(DetectDuplicateInvoiceTool::new(store.clone())))
        .with_tool(Arc::new(CrossReferencePoTool::new(store.clone())))
        .with_tool(Arc::new(ComputeInvoiceTotalsTool::new(store.clone())))
        .with_tool(Arc::new(PeopleDirectoryTool::new(store.clone())))
        .with_tool(Arc::new(QueryUnpaidInvoicesTool::new(store.clone())))
        .with_tool(Arc::new(SendNotificationTool::new(store.clone())))
        .with_tool(Arc::new(UpdatePaymentStatusTool::new(store.clone())))
        .with_tool(Arc::new(GetPaymentStatusTool::new(store)))
        .with_tool(Arc::new(CalculatorTool))
}

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

pub fn extract_string_arg_opt(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Reads a `YYYY-MM-DD` date argument.
pub fn extract_date_arg(args: &Value, key: &str) -> anyhow::Result<NaiveDate> {
    let raw = extract_string_arg(args, key)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid '{}' date '{}': {} (expected YYYY-MM-DD)", key, raw, e))
}
