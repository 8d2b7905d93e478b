//! Data model — findings, resource records and the association graph
//!
//! A [`ResourceRecord`] is the unit of context for one cloud resource:
//! its check results (`config`) plus its association edges to related
//! resources, keyed by ARN. Records are created fresh per finding
//! evaluation and hydrated in place by the drill-down resolver.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Check values are an untyped tagged union: bool, string, number, null,
/// list or map. `null` means "not applicable"; `false` is an explicit
/// negative. Classifiers must keep those apart (see [`tri_state`]).
pub type Value = serde_json::Value;

// ─── Severity ──────────────────────────────────────────────────────

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Default weight used by the findings-score dimension.
    pub fn weight(&self) -> f64 {
        match self {
            Severity::Critical => 4.0,
            Severity::High => 3.0,
            Severity::Medium => 1.0,
            Severity::Low => 0.5,
            Severity::Informational => 0.0,
        }
    }

    /// The largest severity weight, used to normalize per-finding scores.
    pub fn max_weight() -> f64 {
        Severity::Critical.weight()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Informational => "INFORMATIONAL",
        }
    }
}

// ─── Finding ───────────────────────────────────────────────────────

/// Whether a finding is still live in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordState {
    Active,
    Archived,
}

/// An externally supplied security-event record referencing one resource.
/// The engine never originates findings; they arrive from a findings
/// service or a file import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub resource_arn: String,
    pub resource_type: String,
    pub aws_account_id: String,
    pub region: String,
    pub severity: Severity,
    #[serde(default = "default_record_state")]
    pub record_state: RecordState,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_record_state() -> RecordState {
    RecordState::Active
}

// ─── Association slots ─────────────────────────────────────────────

/// One edge of the association graph. Slots start out `Unresolved`
/// (the extractor declares the ARN, nothing more) and are moved to a
/// terminal state by the resolver: `Resolved` with the related record,
/// or `Failed` when resolution was attempted and the resource could not
/// be read. There is no retry within a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AssociationSlot {
    Unresolved,
    Resolved(Box<ResourceRecord>),
    Failed,
}

impl AssociationSlot {
    pub fn record(&self) -> Option<&ResourceRecord> {
        match self {
            AssociationSlot::Resolved(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssociationSlot::Unresolved)
    }
}

// Serialized as the downstream renderers expect: the nested record,
// `false` for a failed resolution, `null` for a never-resolved slot.
impl Serialize for AssociationSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AssociationSlot::Unresolved => serializer.serialize_none(),
            AssociationSlot::Failed => serializer.serialize_bool(false),
            AssociationSlot::Resolved(record) => record.serialize(serializer),
        }
    }
}

// ─── ResourceRecord ────────────────────────────────────────────────

/// The unit of context for one cloud resource.
///
/// `config` maps check names to values; `associations` maps an
/// association kind (`security_groups`, `iam_roles`, ...) to the related
/// ARNs and their resolution state. Only the resolver populates slots
/// beyond `Unresolved`; extractors declare ARNs and stop there.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ResourceRecord {
    pub arn: String,
    pub resource_type: String,
    pub config: BTreeMap<String, Value>,
    pub associations: BTreeMap<String, BTreeMap<String, AssociationSlot>>,
}

impl ResourceRecord {
    pub fn new(arn: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            resource_type: resource_type.into(),
            config: BTreeMap::new(),
            associations: BTreeMap::new(),
        }
    }

    /// Declare an association edge without resolving it.
    pub fn declare_association(&mut self, kind: impl Into<String>, arn: impl Into<String>) {
        self.associations
            .entry(kind.into())
            .or_default()
            .insert(arn.into(), AssociationSlot::Unresolved);
    }

    /// True when the resolver produced nothing at all for this record:
    /// no config and no association edges. Impact dimensions emit
    /// `unknown` in that case rather than guessing.
    pub fn is_unresolved(&self) -> bool {
        self.config.is_empty() && self.associations.is_empty()
    }

    /// Iterate the resolved records under one association kind.
    pub fn resolved(&self, kind: &str) -> impl Iterator<Item = &ResourceRecord> {
        self.associations
            .get(kind)
            .into_iter()
            .flat_map(|slots| slots.values().filter_map(AssociationSlot::record))
    }
}

// ─── Value semantics ───────────────────────────────────────────────

/// Explicit tri-state read of a config key.
///
/// Returns `Some(true)` for an affirmative value, `Some(false)` for an
/// explicit boolean negative, and `None` when the key is missing or
/// `null` (not applicable). A missing key and an explicit `false` are
/// different answers and several dimensions care about the difference.
pub fn tri_state(config: &BTreeMap<String, Value>, key: &str) -> Option<bool> {
    match config.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(v) => Some(is_affirmative(v)),
    }
}

/// Whether a check value counts as evidence that the check matched:
/// `true`, a non-empty string, a nonzero number, or a non-empty
/// list/map. `null` and `false` do not count.
pub fn is_affirmative(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// ─── Serialization shim ────────────────────────────────────────────

/// Association maps serialize through the slot serializer above; this
/// wrapper exists so callers can dump a whole record graph with
/// `serde_json::to_value` and get the `record | false | null` shape in
/// every slot.
pub fn to_output_value(record: &ResourceRecord) -> Result<Value, serde_json::Error> {
    serde_json::to_value(record)
}
