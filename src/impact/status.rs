//! Status dimension — is the resource in use right now
//!
//! An `attached` flag beats a `status` string: `attached`/`not-attached`
//! when present, else `running`/`not-running` from the status value,
//! else `unknown`.

use super::DimensionOutcome;
use crate::model::{tri_state, ResourceRecord, Value};
use serde_json::json;

/// Status strings that count as "in use".
const RUNNING_STATUSES: &[&str] = &["running", "available", "active", "in-use", "enabled"];

pub fn assess_status(record: &ResourceRecord) -> DimensionOutcome {
    if record.is_unresolved() {
        return DimensionOutcome::unknown();
    }

    if let Some(attached) = tri_state(&record.config, "attached") {
        let label = if attached { "attached" } else { "not-attached" };
        return DimensionOutcome::label(label).with_detail("attached", json!(attached));
    }

    if let Some(Value::String(status)) = record.config.get("status") {
        let running = RUNNING_STATUSES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status));
        let label = if running { "running" } else { "not-running" };
        return DimensionOutcome::label(label).with_detail("status", json!(status));
    }

    DimensionOutcome::unknown()
}
