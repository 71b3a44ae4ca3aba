//! Core domain records and the derived valuation types
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product identifier as issued by the reference-data source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

/// External transaction identifier, e.g. `T00042`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub String);

/// Identity of the user that performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<&str> for SaleId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Reference data for a sellable product. The unit label may be corrected
/// post-hoc by an external editor, so valuation output never bakes it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit: String,
}

/// One entry in a product's append-only price history. The price applies
/// from `effective_date` until superseded by a later-dated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub product_id: ProductId,
    pub effective_date: NaiveDate,
    pub unit_price: Decimal,
}

/// A sale header. Lines live separately and reference it by transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub transaction_id: SaleId,
    pub sale_date: DateTime<Utc>,
    pub customer_ref: String,
    pub employee_ref: String,
}

/// One line of a sale. Quantity is a non-negative decimal; fractional
/// quantities are allowed for weight-based units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub transaction_id: SaleId,
    pub product_id: ProductId,
    pub quantity: Decimal,
}

/// Action recorded by the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

/// One entry of the append-only audit log, ordered by insertion timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub table: String,
    pub record_id: String,
    pub action: AuditAction,
    pub actor: ActorId,
    pub timestamp: DateTime<Utc>,
}

/// A sale line with its resolved monetary value. `unit_price` is `None`
/// when no price record covers the sale date; the amount is then zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuedLine {
    pub transaction_id: SaleId,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub amount: Decimal,
}

/// A sale with all of its lines valued and the exact decimal total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValuedSale {
    pub sale: Sale,
    pub lines: Vec<ValuedLine>,
    pub total: Decimal,
}

impl ValuedSale {
    /// The sale's calendar day. UTC date truncation is the one zone policy
    /// used everywhere a timestamp becomes a calendar date.
    pub fn sale_day(&self) -> NaiveDate {
        self.sale.sale_date.date_naive()
    }
}

/// Name/unit lookup built once from the product reference data.
///
/// Display-time unit labels are caller policy. The catalog reports whatever
/// the reference data currently says; a caller that wants to pin the label
/// a sale was recorded with supplies its own lookup instead.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    by_id: HashMap<ProductId, Product>,
}

impl ProductCatalog {
    pub fn from_products(products: Vec<Product>) -> Self {
        let by_id = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { by_id }
    }

    pub fn name_of(&self, id: &ProductId) -> Option<&str> {
        self.by_id.get(id).map(|p| p.name.as_str())
    }

    pub fn unit_of(&self, id: &ProductId) -> Option<&str> {
        self.by_id.get(id).map(|p| p.unit.as_str())
    }
}
