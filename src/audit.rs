//! Attribution reconstruction from the append-only audit log
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::EngineError;
use super::types::{ActorId, AuditAction, AuditEvent};

/// Who did something, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    pub by: ActorId,
    pub at: DateTime<Utc>,
}

/// Point-in-time attribution for one logical record, folded from its
/// audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributionRecord {
    pub created: Option<Attribution>,
    pub updated: Option<Attribution>,
    pub deleted: Option<Attribution>,
}

/// Fold one table's ordered event slice into per-record attribution.
///
/// The slice is demultiplexed by record id in a single pass; the log itself
/// is never mutated or rescanned per record. Per record the fold is:
/// `created` keeps its first occurrence (duplicates ignored), `updated` and
/// `deleted` keep their latest occurrence.
///
/// Precondition: events arrive ordered by timestamp, the order the audit
/// log guarantees on insertion. The ordering is validated defensively and a
/// regression fails loudly with [`EngineError::UnorderedEventLog`] instead
/// of producing silently wrong attribution.
pub fn attribution_for(
    events: &[AuditEvent],
) -> Result<BTreeMap<String, AttributionRecord>, EngineError> {
    for pair in events.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(EngineError::UnorderedEventLog {
                record: pair[1].record_id.clone(),
                at: pair[1].timestamp,
            });
        }
    }

    let mut records: BTreeMap<String, AttributionRecord> = BTreeMap::new();
    for event in events {
        let record = records.entry(event.record_id.clone()).or_default();
        let stamp = Attribution {
            by: event.actor.clone(),
            at: event.timestamp,
        };
        match event.action {
            AuditAction::Created => {
                if record.created.is_none() {
                    record.created = Some(stamp);
                }
            }
            AuditAction::Updated => record.updated = Some(stamp),
            AuditAction::Deleted => record.deleted = Some(stamp),
        }
    }

    Ok(records)
}
