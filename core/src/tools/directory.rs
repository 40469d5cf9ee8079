use crate::tools::ledger::{LedgerStore, Notification};
use crate::tools::{extract_string_arg, extract_string_arg_opt};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

pub struct CrossReferencePoTool {
    store: LedgerStore,
}

impl CrossReferencePoTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CrossReferencePoTool {
    fn name(&self) -> &str {
        "cross_reference_po"
    }

    fn description(&self) -> &str {
        "Find the department a purchase order number belongs to"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "po_number": { "type": "string", "description": "Purchase order number" }
            },
            "required": ["po_number"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let po_number = extract_string_arg(&args, "po_number")?;
        let department = self
            .store
            .read(|l| l.department_for_po(po_number.trim()).map(|d| d.name.clone()))
            .await;

        match department {
            Some(name) => ToolResult::json(&json!({ "po_number": po_number, "department": name })),
            None => Ok(ToolResult::error(format!(
                "No department matches PO number '{po_number}'"
            ))),
        }
    }
}

pub struct PeopleDirectoryTool {
    store: LedgerStore,
}

impl PeopleDirectoryTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for PeopleDirectoryTool {
    fn name(&self) -> &str {
        "get_people_directory"
    }

    fn description(&self) -> &str {
        "List the company's people directory with names, titles and email addresses"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "department": {
                    "type": "string",
                    "description": "Department the request is about (optional)"
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let department = extract_string_arg_opt(&args, "department", "");

        let listing = self
            .store
            .read(|l| {
                let department = if department.trim().is_empty() {
                    None
                } else {
                    match l.department_named(&department) {
                        Some(d) => Some(d.name.clone()),
                        None => return Err(format!("Unknown department '{department}'")),
                    }
                };
                // People carry no department, so the whole directory is listed.
                Ok(json!({ "department": department, "people": l.people }))
            })
            .await;

        match listing {
            Ok(listing) => ToolResult::json(&listing),
            Err(e) => Ok(ToolResult::error(e)),
        }
    }
}

pub struct SendNotificationTool {
    store: LedgerStore,
}

impl SendNotificationTool {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SendNotificationTool {
    fn name(&self) -> &str {
        "send_notification_email"
    }

    fn description(&self) -> &str {
        "Send a notification email to someone in the people directory"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string" },
                "body": { "type": "string" }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let notification = Notification {
            to: extract_string_arg(&args, "to")?,
            subject: extract_string_arg(&args, "subject")?,
            body: extract_string_arg(&args, "body")?,
        };

        let queued = self
            .store
            .write(|l| {
                let known = l
                    .people
                    .iter()
                    .any(|p| p.email.eq_ignore_ascii_case(notification.to.trim()));
                if known {
                    l.outbox.push(notification.clone());
                }
                known.then_some(l.outbox.len())
            })
            .await;

        match queued {
            Some(queued) => {
                info!(to = %notification.to, subject = %notification.subject, "notification queued");
                ToolResult::json(&json!({ "sent": true, "to": notification.to, "outbox": queued }))
            }
            None => Ok(ToolResult::error(format!(
                "'{}' is not in the people directory",
                notification.to
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LedgerStore {
        LedgerStore::seeded().unwrap()
    }

    #[tokio::test]
    async fn po_resolves_to_department() {
        let tool = CrossReferencePoTool::new(store());
        let result = tool
            .execute(json!({"po_number": "b7c902d2-6ef9-4a0c-8b64-4b21a4e9d8f5"}))
            .await
            .unwrap();
        assert!(result.output.contains("Operations"));

        let missing = tool.execute(json!({"po_number": "58254a76"})).await.unwrap();
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn directory_lists_everyone() {
        let tool = PeopleDirectoryTool::new(store());
        let result = tool.execute(json!({"department": "creative"})).await.unwrap();
        let listing: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(listing["department"], "Creative");
        assert_eq!(listing["people"].as_array().unwrap().len(), 16);

        let unknown = tool.execute(json!({"department": "Legal"})).await.unwrap();
        assert!(!unknown.success);
        assert!(tool.execute(json!({})).await.unwrap().success);
    }

    #[tokio::test]
    async fn notifications_only_reach_known_people() {
        let store = store();
        let tool = SendNotificationTool::new(store.clone());

        let sent = tool
            .execute(json!({
                "to": "tanya.desai@duo-marketing.com",
                "subject": "Overdue invoices",
                "body": "Three invoices are overdue."
            }))
            .await
            .unwrap();
        assert!(sent.success);

        let rejected = tool
            .execute(json!({"to": "nobody@example.com", "subject": "s", "body": "b"}))
            .await
            .unwrap();
        assert!(!rejected.success);

        let outbox = store.read(|l| l.outbox.clone()).await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "Overdue invoices");
    }
}
