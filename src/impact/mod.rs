//! Impact dimensions — deterministic classifiers over resolved context
//!
//! Each dimension is a pure function from a resolved [`ResourceRecord`]
//! (plus tags and account metadata) to a label with supporting details.
//! All dimensions share one convention: a record with neither config
//! nor associations populated means the resolver produced nothing at
//! all, and the dimension answers `unknown` instead of guessing. That
//! is a different outcome from a dimension-specific "no evidence either
//! way".

pub mod access;
pub mod aggregate;
pub mod encryption;
pub mod exposure;
pub mod findings;
pub mod status;
pub mod tags;

pub use access::assess_access;
pub use aggregate::{aggregate, MetaScore};
pub use encryption::assess_encryption;
pub use exposure::assess_exposure;
pub use findings::{score_findings, FindingsSummary};
pub use status::assess_status;
pub use tags::{assess_application, assess_environment, assess_owner};

use crate::model::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Label shared by every dimension for a totally unresolved record.
pub const UNKNOWN: &str = "unknown";

// ─── Dimension outcome ─────────────────────────────────────────────

/// One dimension's answer: a label plus whatever evidence backs it.
/// Serializes as `{label: details}`, the shape downstream renderers
/// consume.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionOutcome {
    pub label: String,
    pub details: BTreeMap<String, Value>,
}

impl DimensionOutcome {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn unknown() -> Self {
        Self::label(UNKNOWN)
    }

    pub fn is_unknown(&self) -> bool {
        self.label == UNKNOWN
    }
}

impl Serialize for DimensionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.details)?;
        map.end()
    }
}

// ─── Score sentinels ───────────────────────────────────────────────

/// Final impact score. `Disabled` is what a malformed weights table
/// produces: the dimension labels survive but no number is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Value(f64),
    Disabled,
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Disabled => None,
        }
    }
}

// `100.0` renders as `100`, `38.25` stays fractional, disabled scoring
// renders as `false`.
impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Value(v) if v.fract() == 0.0 => serializer.serialize_u64(*v as u64),
            Score::Value(v) => serializer.serialize_f64(*v),
            Score::Disabled => serializer.serialize_bool(false),
        }
    }
}

// ─── Assessment ────────────────────────────────────────────────────

/// Everything the engine knows about one resource's impact: the seven
/// dimension labels, the findings summary and the aggregate score.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactAssessment {
    pub exposure: DimensionOutcome,
    pub access: DimensionOutcome,
    pub encryption: DimensionOutcome,
    pub status: DimensionOutcome,
    pub environment: DimensionOutcome,
    pub application: DimensionOutcome,
    pub owner: DimensionOutcome,
    pub findings: FindingsSummary,
    pub meta_score: MetaScore,
    pub score: Score,
}

impl ImpactAssessment {
    /// The seven (dimension, label) pairs the aggregator consumes, in
    /// a fixed order so scoring is deterministic.
    pub fn labels(&self) -> [(&'static str, &str); 7] {
        [
            ("exposure", self.exposure.label.as_str()),
            ("access", self.access.label.as_str()),
            ("encryption", self.encryption.label.as_str()),
            ("status", self.status.label.as_str()),
            ("environment", self.environment.label.as_str()),
            ("application", self.application.label.as_str()),
            ("owner", self.owner.label.as_str()),
        ]
    }
}
