//! Aggregation over valued sales: daily series, top-N revenue, roll-ups
use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{ProductCatalog, ProductId, ValuedSale};

/// One calendar day of the trailing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub transaction_count: u64,
}

/// One row of the top-by-revenue ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRevenue {
    pub product_id: ProductId,
    pub name: String,
    pub total_amount: Decimal,
}

/// One row of a category roll-up of the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub total_amount: Decimal,
}

/// Where the trailing window ends: a caller-supplied "today", or the latest
/// sale date in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    At(NaiveDate),
    LatestSale,
}

/// Trailing daily time series over the sales' UTC calendar dates.
///
/// Emits exactly `window_days` entries ending at the window end, strictly
/// ascending, with days that saw no transactions zero-filled rather than
/// omitted. `window_days == 0` is an empty series, as is `LatestSale` over
/// an empty snapshot (no date to anchor the window). Pure function of its
/// inputs.
pub fn daily_series(sales: &[ValuedSale], window_days: u32, end: WindowEnd) -> Vec<DaySummary> {
    if window_days == 0 {
        return Vec::new();
    }
    let end = match end {
        WindowEnd::At(date) => date,
        WindowEnd::LatestSale => match sales.iter().map(ValuedSale::sale_day).max() {
            Some(date) => date,
            None => return Vec::new(),
        },
    };
    let Some(start) = end.checked_sub_days(Days::new(u64::from(window_days) - 1)) else {
        return Vec::new();
    };

    let mut by_day: BTreeMap<NaiveDate, (Decimal, u64)> = BTreeMap::new();
    for sale in sales {
        let entry = by_day.entry(sale.sale_day()).or_default();
        entry.0 += sale.total;
        entry.1 += 1;
    }

    start
        .iter_days()
        .take(window_days as usize)
        .map(|date| {
            let (total_amount, transaction_count) =
                by_day.get(&date).copied().unwrap_or((Decimal::ZERO, 0));
            DaySummary {
                date,
                total_amount,
                transaction_count,
            }
        })
        .collect()
}

/// Rank products by summed line revenue, descending, ties broken by product
/// id ascending, truncated to `k`.
///
/// Zero and negative totals stay in the ranking; use
/// [`top_by_revenue_positive`] to ask for the filter explicitly. Names come
/// from the catalog, falling back to the product id for unknown products.
pub fn top_by_revenue(
    sales: &[ValuedSale],
    catalog: &ProductCatalog,
    k: usize,
) -> Vec<ProductRevenue> {
    let mut totals: BTreeMap<ProductId, Decimal> = BTreeMap::new();
    for sale in sales {
        for line in &sale.lines {
            *totals.entry(line.product_id.clone()).or_default() += line.amount;
        }
    }

    let mut rows: Vec<ProductRevenue> = totals
        .into_iter()
        .map(|(product_id, total_amount)| {
            let name = catalog
                .name_of(&product_id)
                .unwrap_or(product_id.0.as_str())
                .to_owned();
            ProductRevenue {
                product_id,
                name,
                total_amount,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    rows.truncate(k);

    rows
}

/// [`top_by_revenue`] with products at zero or negative revenue filtered
/// out. This is the explicit opt-in; the default ranking keeps them.
pub fn top_by_revenue_positive(
    sales: &[ValuedSale],
    catalog: &ProductCatalog,
    k: usize,
) -> Vec<ProductRevenue> {
    let mut rows = top_by_revenue(sales, catalog, usize::MAX);
    rows.retain(|row| row.total_amount > Decimal::ZERO);
    rows.truncate(k);

    rows
}

/// Re-label a product ranking into categories through a caller-supplied
/// mapping. The engine invents no category semantics; the label function is
/// the whole policy. Output is sorted descending by total, label ascending
/// on ties.
pub fn roll_up(
    rows: &[ProductRevenue],
    label: impl Fn(&ProductId) -> String,
) -> Vec<CategoryRevenue> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in rows {
        *totals.entry(label(&row.product_id)).or_default() += row.total_amount;
    }

    let mut categories: Vec<CategoryRevenue> = totals
        .into_iter()
        .map(|(category, total_amount)| CategoryRevenue {
            category,
            total_amount,
        })
        .collect();
    categories.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    categories
}
