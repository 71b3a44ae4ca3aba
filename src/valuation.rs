//! Line and sale valuation against a price-history snapshot
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::EngineError;
use super::pricing::PriceBook;
use super::types::{PriceRecord, Sale, SaleId, SaleLine, ValuedLine, ValuedSale};

/// Value one line at the sale's date.
///
/// Prices are retroactively stable: resolution always uses the date the sale
/// was recorded on, never "today". A missing price yields `unit_price: None`
/// and a zero amount. A negative quantity is malformed input and is raised
/// to the caller, never repaired.
pub fn valuate_line(
    line: &SaleLine,
    sale_date: NaiveDate,
    book: &PriceBook,
) -> Result<ValuedLine, EngineError> {
    if line.quantity < Decimal::ZERO {
        return Err(EngineError::NegativeQuantity {
            transaction: line.transaction_id.0.clone(),
            product: line.product_id.0.clone(),
            quantity: line.quantity,
        });
    }

    let unit_price = book.resolve(&line.product_id, sale_date);
    let amount = unit_price.map_or(Decimal::ZERO, |price| price * line.quantity);

    Ok(ValuedLine {
        transaction_id: line.transaction_id.clone(),
        product_id: line.product_id.clone(),
        quantity: line.quantity,
        unit_price,
        amount,
    })
}

/// Value a sale: every line in input order, total as the exact decimal sum.
pub fn valuate_sale(
    sale: &Sale,
    lines: &[SaleLine],
    book: &PriceBook,
) -> Result<ValuedSale, EngineError> {
    let sale_day = sale.sale_date.date_naive();

    let mut valued = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let valued_line = valuate_line(line, sale_day, book)?;
        total += valued_line.amount;
        valued.push(valued_line);
    }

    Ok(ValuedSale {
        sale: sale.clone(),
        lines: valued,
        total,
    })
}

/// Value a whole snapshot in one pass.
///
/// The price book is built once and the lines are grouped by transaction id
/// once; no per-line lookups against anything but the in-memory index. A
/// sale without lines values to zero. Lines whose transaction id matches no
/// sale are ignored here; the service layer counts and logs them as a
/// torn-read signal.
pub fn valuate_sales(
    sales: &[Sale],
    lines: &[SaleLine],
    prices: Vec<PriceRecord>,
) -> Result<Vec<ValuedSale>, EngineError> {
    let book = PriceBook::from_records(prices);

    let mut lines_by_sale: HashMap<&SaleId, Vec<&SaleLine>> = HashMap::new();
    for line in lines {
        lines_by_sale.entry(&line.transaction_id).or_default().push(line);
    }

    let mut valued = Vec::with_capacity(sales.len());
    for sale in sales {
        let sale_day = sale.sale_date.date_naive();
        let own_lines = lines_by_sale
            .get(&sale.transaction_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut valued_lines = Vec::with_capacity(own_lines.len());
        let mut total = Decimal::ZERO;
        for line in own_lines {
            let valued_line = valuate_line(line, sale_day, &book)?;
            total += valued_line.amount;
            valued_lines.push(valued_line);
        }

        valued.push(ValuedSale {
            sale: sale.clone(),
            lines: valued_lines,
            total,
        });
    }

    Ok(valued)
}
