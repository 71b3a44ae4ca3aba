use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("negative quantity {quantity} on line {transaction}/{product}")]
    NegativeQuantity {
        transaction: String,
        product: String,
        quantity: Decimal,
    },
    #[error("audit log out of timestamp order at record {record} ({at})")]
    UnorderedEventLog { record: String, at: DateTime<Utc> },
}
