//! Effective-price resolution over an indexed price-history snapshot
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{PriceRecord, ProductId};

/// The full price history indexed for repeated in-memory resolution.
///
/// Built once per reporting pass from a single batch fetch; every lookup
/// afterwards is a binary search, never a backend round trip.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    // per product, sorted by effective date; the stable sort keeps insertion
    // order within equal dates so the latest-inserted record sorts last
    by_product: HashMap<ProductId, Vec<(NaiveDate, Decimal)>>,
}

impl PriceBook {
    pub fn from_records(records: Vec<PriceRecord>) -> Self {
        let mut by_product: HashMap<ProductId, Vec<(NaiveDate, Decimal)>> = HashMap::new();
        for record in records {
            by_product
                .entry(record.product_id)
                .or_default()
                .push((record.effective_date, record.unit_price));
        }
        for history in by_product.values_mut() {
            history.sort_by_key(|(date, _)| *date);
        }

        Self { by_product }
    }

    /// The price in effect for `product` on `on`: the record with the
    /// greatest effective date that is not after `on`.
    ///
    /// Returns `None` when no record qualifies; an unknown product or a date
    /// before the first record is absence, never an error. When two records
    /// share an effective date, the latest-inserted one wins.
    pub fn resolve(&self, product: &ProductId, on: NaiveDate) -> Option<Decimal> {
        let history = self.by_product.get(product)?;
        let idx = history.partition_point(|(date, _)| *date <= on);
        if idx == 0 {
            return None;
        }

        Some(history[idx - 1].1)
    }

    /// Number of products with at least one price record.
    pub fn products(&self) -> usize {
        self.by_product.len()
    }
}
