//! Impact aggregator — one weighted score from the dimension labels
//!
//! For each dimension whose emitted label appears in the weights table,
//! accumulate `weight` and `weight * score`; dimensions the table does
//! not know are excluded from both totals, never treated as zero. The
//! meta score is the weighted mean, or `n/a` when nothing matched; the
//! final score multiplies it with the findings score onto a 0–100
//! scale. A meta score of exactly zero is substituted with 0.1 so a
//! resource with live findings can never score a flat 0.

use super::Score;
use crate::config::ImpactTable;
use serde::{Serialize, Serializer};

/// Weighted mean over the matched dimensions, or the `n/a` sentinel
/// when no dimension matched the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetaScore {
    Value(f64),
    NotApplicable,
}

impl Serialize for MetaScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetaScore::Value(v) => serializer.serialize_f64(*v),
            MetaScore::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

/// Combine dimension labels and the findings score under the table's
/// rules. A table that fails validation disables scoring entirely; the
/// dimension labels computed upstream still stand.
pub fn aggregate(
    labels: &[(&str, &str)],
    findings_score: f64,
    table: &ImpactTable,
) -> (MetaScore, Score) {
    if let Err(e) = table.validate() {
        tracing::warn!("Impact scoring disabled: {}", e);
        return (MetaScore::NotApplicable, Score::Disabled);
    }

    let mut weight_total = 0.0;
    let mut score_total = 0.0;
    for (dimension, label) in labels {
        if let Some((weight, score)) = table.lookup(dimension, label) {
            weight_total += weight;
            score_total += weight * score;
        }
    }

    let meta = if weight_total > 0.0 {
        MetaScore::Value(score_total / weight_total)
    } else {
        MetaScore::NotApplicable
    };

    let raw = match meta {
        MetaScore::NotApplicable => findings_score * 100.0,
        // Anti-zero rule: live findings must not vanish behind a zero
        // context multiplier.
        MetaScore::Value(m) if m == 0.0 => findings_score * 0.1 * 100.0,
        MetaScore::Value(m) => findings_score * m * 100.0,
    };

    (meta, Score::Value(round2(raw)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
