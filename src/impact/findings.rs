//! Findings score — how much active trouble this resource carries
//!
//! Each active finding contributes its severity weight normalized by
//! the largest weight; the sum is clamped to [0, 1]. Archived findings
//! count for nothing.

use crate::model::{Finding, RecordState, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-severity counts of active findings plus the normalized score.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingsSummary {
    pub counts: BTreeMap<Severity, usize>,
    pub score: f64,
}

pub fn score_findings(findings: &[Finding]) -> FindingsSummary {
    let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
    let mut total = 0.0;

    for finding in findings
        .iter()
        .filter(|f| f.record_state == RecordState::Active)
    {
        *counts.entry(finding.severity).or_default() += 1;
        total += finding.severity.weight() / Severity::max_weight();
    }

    FindingsSummary {
        counts,
        score: total.clamp(0.0, 1.0),
    }
}
