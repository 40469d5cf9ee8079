use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

const SEED: &str = include_str!("../../data/ledger.json");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Overdue,
}

impl std::str::FromStr for InvoiceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "overdue" => Ok(Self::Overdue),
            other => anyhow::bail!("Unknown status '{}'. Expected paid, unpaid or overdue", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub price: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub date: NaiveDate,
    pub amount: i64,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub currency: String,
    pub customer_name: String,
    pub po_number: String,
    pub terms: String,
    pub notes: String,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

impl Invoice {
    pub fn items_total(&self) -> i64 {
        self.items.iter().map(|i| i.total).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    pub invoices: Vec<Invoice>,
    pub departments: Vec<Department>,
    pub people: Vec<Person>,
    #[serde(default)]
    pub outbox: Vec<Notification>,
}

impl Ledger {
    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id == id)
    }

    pub fn invoice_mut(&mut self, id: &str) -> Option<&mut Invoice> {
        self.invoices.iter_mut().find(|i| i.id == id)
    }

    pub fn department_for_po(&self, po_number: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.id == po_number)
    }

    pub fn department_named(&self, name: &str) -> Option<&Department> {
        self.departments
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
    }
}

/// Shared handle to the ledger the invoice tools work on.
#[derive(Clone, Default)]
pub struct LedgerStore {
    inner: Arc<RwLock<Ledger>>,
}

impl LedgerStore {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// The bundled sample ledger.
    pub fn seeded() -> Result<Self> {
        let ledger: Ledger =
            serde_json::from_str(SEED).context("Failed to parse bundled ledger data")?;
        Ok(Self::new(ledger))
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let ledger = self.inner.read().await;
        f(&ledger)
    }

    pub async fn write<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        let mut ledger = self.inner.write().await;
        f(&mut ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_loads() {
        let store = LedgerStore::seeded().unwrap();
        let (invoices, departments, people) = store
            .read(|l| (l.invoices.len(), l.departments.len(), l.people.len()))
            .await;
        assert_eq!(invoices, 20);
        assert_eq!(departments, 5);
        assert_eq!(people, 16);
    }

    #[tokio::test]
    async fn lookups() {
        let store = LedgerStore::seeded().unwrap();
        store
            .read(|l| {
                assert_eq!(
                    l.department_for_po("695e7e5b-149f-4505-a139-30dd33e5a76f")
                        .map(|d| d.name.as_str()),
                    Some("Marketing")
                );
                assert!(l.department_named("operations").is_some());
                assert!(l.invoice("5d4259c4-cbe5-4766-972a-1a5e0311f20e").is_some());
            })
            .await;
    }

    #[test]
    fn status_parses() {
        assert_eq!("Paid".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("refunded".parse::<InvoiceStatus>().is_err());
    }
}
