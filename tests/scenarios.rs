use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sales_valuation::report::WindowEnd;
use sales_valuation::service::{
    AttributionPolicy, DateRange, ReportingService, SALES_TABLE, SalesDataSource,
};
use sales_valuation::types::{
    ActorId, AuditAction, AuditEvent, PriceRecord, Product, ProductId, Sale, SaleId, SaleLine,
};

// Fixture source holding the snapshot in memory. The filters behave like the
// backend's would so the service's batch-fetch calls are exercised for real.
#[derive(Default)]
struct InMemorySource {
    products: Vec<Product>,
    prices: Vec<PriceRecord>,
    sales: Vec<Sale>,
    lines: Vec<SaleLine>,
    events: Vec<AuditEvent>,
}

impl SalesDataSource for InMemorySource {
    fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.products.clone())
    }

    fn list_prices(&self, product_ids: Option<&[ProductId]>) -> anyhow::Result<Vec<PriceRecord>> {
        Ok(self
            .prices
            .iter()
            .filter(|p| product_ids.is_none_or(|ids| ids.contains(&p.product_id)))
            .cloned()
            .collect())
    }

    fn list_sales(&self, range: Option<DateRange>) -> anyhow::Result<Vec<Sale>> {
        Ok(self
            .sales
            .iter()
            .filter(|s| {
                range.is_none_or(|r| {
                    let day = s.sale_date.date_naive();
                    r.from <= day && day <= r.to
                })
            })
            .cloned()
            .collect())
    }

    fn list_lines(&self, sale_ids: Option<&[SaleId]>) -> anyhow::Result<Vec<SaleLine>> {
        Ok(self
            .lines
            .iter()
            .filter(|l| sale_ids.is_none_or(|ids| ids.contains(&l.transaction_id)))
            .cloned()
            .collect())
    }

    fn list_events(
        &self,
        table: &str,
        record_ids: Option<&[String]>,
    ) -> anyhow::Result<Vec<AuditEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.table == table)
            .filter(|e| record_ids.is_none_or(|ids| ids.contains(&e.record_id)))
            .cloned()
            .collect())
    }
}

struct AllowAll;
struct DenyAll;

impl AttributionPolicy for AllowAll {
    fn can_view_attribution(&self) -> bool {
        true
    }
}

impl AttributionPolicy for DenyAll {
    fn can_view_attribution(&self) -> bool {
        false
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sale(id: &str, y: i32, m: u32, d: u32) -> Sale {
    Sale {
        transaction_id: SaleId::from(id),
        sale_date: Utc.with_ymd_and_hms(y, m, d, 14, 0, 0).unwrap(),
        customer_ref: "C1".into(),
        employee_ref: "E1".into(),
    }
}

fn line(sale_id: &str, product: &str, quantity: Decimal) -> SaleLine {
    SaleLine {
        transaction_id: SaleId::from(sale_id),
        product_id: ProductId::from(product),
        quantity,
    }
}

fn price(product: &str, y: i32, m: u32, d: u32, cents: i64) -> PriceRecord {
    PriceRecord {
        product_id: ProductId::from(product),
        effective_date: day(y, m, d),
        unit_price: Decimal::new(cents, 2),
    }
}

fn event(record: &str, action: AuditAction, actor: &str, minute: u32) -> AuditEvent {
    AuditEvent {
        table: SALES_TABLE.into(),
        record_id: record.into(),
        action,
        actor: ActorId::from(actor),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, minute, 0).unwrap(),
    }
}

// price history (P1, 2024-01-01, 10.00), (P1, 2024-03-01, 12.00):
// 3 units on 2024-02-15 value at 10.00, the same product on 2024-03-15 at 12.00
#[test]
fn retroactive_prices_hold_per_sale_date() -> anyhow::Result<()> {
    let source = InMemorySource {
        products: vec![Product {
            id: ProductId::from("P1"),
            name: "Widget".into(),
            unit: "pcs".into(),
        }],
        prices: vec![price("P1", 2024, 1, 1, 1000), price("P1", 2024, 3, 1, 1200)],
        sales: vec![sale("T00001", 2024, 2, 15), sale("T00002", 2024, 3, 15)],
        lines: vec![
            line("T00001", "P1", Decimal::new(3, 0)),
            line("T00002", "P1", Decimal::new(3, 0)),
        ],
        ..Default::default()
    };
    let service = ReportingService::new(source, DenyAll);

    let report = service
        .sales_report(60, 10, WindowEnd::LatestSale)
        .context("reporting pass failed")?;

    assert_eq!(report.sales[0].total, Decimal::new(3000, 2));
    assert_eq!(report.sales[1].total, Decimal::new(3600, 2));

    Ok(())
}

#[test]
fn full_reporting_pass() -> anyhow::Result<()> {
    let source = InMemorySource {
        products: vec![
            Product {
                id: ProductId::from("P1"),
                name: "Widget".into(),
                unit: "pcs".into(),
            },
            Product {
                id: ProductId::from("P2"),
                name: "Grommet".into(),
                unit: "kg".into(),
            },
        ],
        prices: vec![price("P1", 2024, 1, 1, 1000), price("P2", 2024, 1, 1, 500)],
        sales: vec![
            sale("T00001", 2024, 5, 1),
            sale("T00002", 2024, 5, 1),
            sale("T00003", 2024, 5, 3),
        ],
        lines: vec![
            line("T00001", "P1", Decimal::new(2, 0)),
            line("T00002", "P2", Decimal::new(4, 0)),
            line("T00003", "P1", Decimal::new(1, 0)),
        ],
        events: vec![
            event("T00001", AuditAction::Created, "alice", 0),
            event("T00002", AuditAction::Created, "bob", 1),
            event("T00001", AuditAction::Updated, "bob", 2),
            event("T00003", AuditAction::Created, "alice", 3),
        ],
    };
    let service = ReportingService::new(source, AllowAll);

    let report = service
        .sales_report(3, 10, WindowEnd::At(day(2024, 5, 3)))
        .context("reporting pass failed")?;

    // the window covers may 1 through may 3, zero-filled in the middle
    assert_eq!(report.series.len(), 3);
    assert_eq!(report.series[0].date, day(2024, 5, 1));
    assert_eq!(report.series[0].transaction_count, 2);
    assert_eq!(report.series[0].total_amount, Decimal::new(4000, 2));
    assert_eq!(report.series[1].transaction_count, 0);
    assert_eq!(report.series[2].transaction_count, 1);

    // P1 revenue 30.00 beats P2 revenue 20.00
    assert_eq!(report.top_products.len(), 2);
    assert_eq!(report.top_products[0].name, "Widget");
    assert_eq!(report.top_products[0].total_amount, Decimal::new(3000, 2));
    assert_eq!(report.top_products[1].total_amount, Decimal::new(2000, 2));

    let attribution = report.attribution.as_ref().expect("policy allows");
    let first = &attribution["T00001"];
    assert_eq!(first.created.as_ref().unwrap().by, ActorId::from("alice"));
    assert_eq!(first.updated.as_ref().unwrap().by, ActorId::from("bob"));
    assert!(first.deleted.is_none());

    assert_eq!(report.orphaned_lines, 0);

    Ok(())
}

#[test]
fn attribution_is_omitted_for_non_privileged_callers() -> anyhow::Result<()> {
    let source = InMemorySource {
        prices: vec![price("P1", 2024, 1, 1, 1000)],
        sales: vec![sale("T00001", 2024, 5, 1)],
        lines: vec![line("T00001", "P1", Decimal::ONE)],
        events: vec![event("T00001", AuditAction::Created, "alice", 0)],
        ..Default::default()
    };
    let service = ReportingService::new(source, DenyAll);

    let report = service.sales_report(7, 5, WindowEnd::LatestSale)?;

    // omitted outright, not an empty map
    assert!(report.attribution.is_none());

    Ok(())
}

#[test]
fn torn_snapshot_is_surfaced_not_hidden() -> anyhow::Result<()> {
    let mut source = InMemorySource {
        prices: vec![price("P1", 2024, 1, 1, 1000)],
        sales: vec![sale("T00001", 2024, 5, 1)],
        lines: vec![line("T00001", "P1", Decimal::ONE)],
        ..Default::default()
    };
    // a line whose sale the snapshot never saw
    source.lines.push(line("T00099", "P1", Decimal::ONE));
    let service = ReportingService::new(source, DenyAll);

    let report = service.sales_report(7, 5, WindowEnd::LatestSale)?;

    assert_eq!(report.orphaned_lines, 1);
    // the orphan contributes to no sale's valuation
    assert_eq!(report.sales.len(), 1);
    assert_eq!(report.sales[0].total, Decimal::new(1000, 2));

    Ok(())
}

#[test]
fn next_transaction_id_follows_the_latest_sale() -> anyhow::Result<()> {
    let source = InMemorySource {
        sales: vec![
            sale("T00041", 2024, 5, 1),
            sale("T00042", 2024, 5, 2), // latest by date
            sale("T00007", 2024, 4, 1),
        ],
        ..Default::default()
    };
    let service = ReportingService::new(source, DenyAll);

    assert_eq!(service.next_transaction_id()?, "T00043");

    Ok(())
}

#[test]
fn next_transaction_id_seeds_an_empty_ledger() -> anyhow::Result<()> {
    let service = ReportingService::new(InMemorySource::default(), DenyAll);

    assert_eq!(service.next_transaction_id()?, "T00001");

    Ok(())
}

#[test]
fn valued_sale_view_matches_the_report() -> anyhow::Result<()> {
    let source = InMemorySource {
        prices: vec![price("P1", 2024, 1, 1, 250)],
        sales: vec![sale("T00001", 2024, 5, 1), sale("T00002", 2024, 5, 2)],
        lines: vec![
            line("T00001", "P1", Decimal::new(2, 0)),
            line("T00002", "P1", Decimal::new(8, 0)),
        ],
        ..Default::default()
    };
    let service = ReportingService::new(source, DenyAll);

    let valued = service
        .valued_sale(&SaleId::from("T00002"))?
        .expect("sale exists");
    assert_eq!(valued.total, Decimal::new(2000, 2));

    assert!(service.valued_sale(&SaleId::from("T99999"))?.is_none());

    Ok(())
}
