//! Service layer API for reporting passes over external data sources
use std::collections::{BTreeMap, HashSet};

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::audit::{AttributionRecord, attribution_for};
use super::ident::next_identifier;
use super::report::{DaySummary, ProductRevenue, WindowEnd, daily_series, top_by_revenue};
use super::types::{
    AuditEvent, PriceRecord, Product, ProductCatalog, ProductId, Sale, SaleId, SaleLine, ValuedSale,
};
use super::valuation::valuate_sales;

/// Audit-log table name under which sale records are journaled.
pub const SALES_TABLE: &str = "sales";

/// Inclusive calendar-date range for snapshot fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// The already-authorized, already-validated collections the engine
/// consumes. Implementations fetch from whatever backend the surrounding
/// application uses; the engine only ever sees materialized rows.
pub trait SalesDataSource {
    fn list_products(&self) -> anyhow::Result<Vec<Product>>;
    fn list_prices(&self, product_ids: Option<&[ProductId]>) -> anyhow::Result<Vec<PriceRecord>>;
    fn list_sales(&self, range: Option<DateRange>) -> anyhow::Result<Vec<Sale>>;
    fn list_lines(&self, sale_ids: Option<&[SaleId]>) -> anyhow::Result<Vec<SaleLine>>;
    /// Events for one table, guaranteed ordered by insertion timestamp.
    fn list_events(
        &self,
        table: &str,
        record_ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<AuditEvent>>;
}

/// Decides whether the caller may see attribution data at all. When it
/// denies, report output omits attribution entirely rather than carrying
/// null-filled placeholders.
pub trait AttributionPolicy {
    fn can_view_attribution(&self) -> bool;
}

/// Everything one reporting pass produces from a single snapshot.
#[derive(Debug, Clone)]
pub struct SalesReport {
    pub sales: Vec<ValuedSale>,
    pub series: Vec<DaySummary>,
    pub top_products: Vec<ProductRevenue>,
    /// `None` when the policy denies attribution access.
    pub attribution: Option<BTreeMap<String, AttributionRecord>>,
    /// Lines whose sale was not in the snapshot. Non-zero means the backend
    /// reads were not transactionally consistent; the caller should flag
    /// the report rather than trust it blindly.
    pub orphaned_lines: usize,
}

pub struct ReportingService<S, P> {
    source: S,
    policy: P,
}

impl<S: SalesDataSource, P: AttributionPolicy> ReportingService<S, P> {
    pub fn new(source: S, policy: P) -> Self {
        Self { source, policy }
    }

    /// Run one full reporting pass.
    ///
    /// All backend reads happen up front, once: sales, their lines, the
    /// price history for the products involved, the product catalog, and
    /// (policy permitting) the sales audit slice. Everything after that is
    /// pure computation over the in-memory snapshot.
    pub fn sales_report(
        &self,
        window_days: u32,
        top_k: usize,
        end: WindowEnd,
    ) -> anyhow::Result<SalesReport> {
        let sales = self
            .source
            .list_sales(None)
            .context("failed to list sales")?;
        let sale_ids: Vec<SaleId> = sales.iter().map(|s| s.transaction_id.clone()).collect();
        let lines = self
            .source
            .list_lines(Some(&sale_ids))
            .context("failed to list sale lines")?;

        let product_ids: Vec<ProductId> = {
            let mut seen = HashSet::new();
            lines
                .iter()
                .filter(|line| seen.insert(line.product_id.clone()))
                .map(|line| line.product_id.clone())
                .collect()
        };
        let prices = self
            .source
            .list_prices(Some(&product_ids))
            .context("failed to list price history")?;
        let products = self
            .source
            .list_products()
            .context("failed to list products")?;
        debug!(
            sales = sales.len(),
            lines = lines.len(),
            prices = prices.len(),
            "materialized reporting snapshot"
        );

        let known: HashSet<&SaleId> = sales.iter().map(|s| &s.transaction_id).collect();
        let orphaned_lines = lines
            .iter()
            .filter(|line| !known.contains(&line.transaction_id))
            .count();
        if orphaned_lines > 0 {
            warn!(orphaned_lines, "snapshot contains lines without a sale; possible torn read");
        }

        let valued = valuate_sales(&sales, &lines, prices)?;
        let catalog = ProductCatalog::from_products(products);
        let series = daily_series(&valued, window_days, end);
        let top_products = top_by_revenue(&valued, &catalog, top_k);

        let attribution = if self.policy.can_view_attribution() {
            let record_ids: Vec<String> = sale_ids.iter().map(|id| id.0.clone()).collect();
            let events = self
                .source
                .list_events(SALES_TABLE, Some(&record_ids))
                .context("failed to list audit events")?;
            Some(attribution_for(&events)?)
        } else {
            None
        };

        Ok(SalesReport {
            sales: valued,
            series,
            top_products,
            attribution,
            orphaned_lines,
        })
    }

    /// Value a single sale using the same batch machinery.
    pub fn valued_sale(&self, sale_id: &SaleId) -> anyhow::Result<Option<ValuedSale>> {
        let sales = self
            .source
            .list_sales(None)
            .context("failed to list sales")?;
        let Some(sale) = sales.into_iter().find(|s| &s.transaction_id == sale_id) else {
            return Ok(None);
        };

        let ids = [sale.transaction_id.clone()];
        let lines = self
            .source
            .list_lines(Some(&ids))
            .context("failed to list sale lines")?;
        let product_ids: Vec<ProductId> = lines.iter().map(|l| l.product_id.clone()).collect();
        let prices = self
            .source
            .list_prices(Some(&product_ids))
            .context("failed to list price history")?;

        let mut valued = valuate_sales(std::slice::from_ref(&sale), &lines, prices)?;
        Ok(valued.pop())
    }

    /// The next external transaction identifier.
    ///
    /// Takes the identifier of the most recently dated sale and applies the
    /// pure generator. Two concurrent callers can receive the same value;
    /// the persistence layer's uniqueness constraint is what prevents a
    /// double insert, and the caller retries on that conflict.
    pub fn next_transaction_id(&self) -> anyhow::Result<String> {
        let sales = self
            .source
            .list_sales(None)
            .context("failed to list sales")?;
        let last = sales
            .iter()
            .max_by(|a, b| {
                a.sale_date
                    .cmp(&b.sale_date)
                    .then_with(|| a.transaction_id.cmp(&b.transaction_id))
            })
            .map(|sale| sale.transaction_id.0.as_str());

        Ok(next_identifier(last))
    }
}
