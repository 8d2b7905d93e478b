//! IAM-style policy model — documents, statements and risk taxonomy
//!
//! Policy documents arrive as untyped JSON from resource policies,
//! identity policies and trust policies. The serde shapes here absorb
//! the format's flexibility (single statement or list, string or list
//! of strings, `"*"` or keyed principal map) so the classifier can work
//! over normalized data.

pub mod classifier;
pub mod security_group;

pub use classifier::PolicyClassifier;
pub use security_group::{classify_rules, RuleReport, SecurityGroupRule};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ─── Field shapes ──────────────────────────────────────────────────

/// A field that the policy language allows as either one string or a
/// list of strings (`Action`, `NotAction`, `Resource`, principal values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrVec {
    One(String),
    Many(Vec<String>),
}

impl StringOrVec {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            StringOrVec::One(s) => std::slice::from_ref(s),
            StringOrVec::Many(v) => v.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|s| s == needle)
    }
}

/// `Principal` / `NotPrincipal`: either the bare wildcard string `"*"`
/// or a map keyed by principal class (`AWS`, `Service`, `Federated`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Map(BTreeMap<String, StringOrVec>),
}

impl Principal {
    /// Literal `"*"` or `{AWS: "*"}`.
    pub fn is_wildcard(&self) -> bool {
        match self {
            Principal::Wildcard(s) => s == "*",
            Principal::Map(map) => map.get("AWS").map(|v| v.contains("*")).unwrap_or(false),
        }
    }

    /// The principal identifiers the account-based checks evaluate:
    /// `AWS` and `Federated` entries, coerced to a list. A bare string
    /// principal is its own single candidate.
    pub fn account_candidates(&self) -> Vec<&str> {
        match self {
            Principal::Wildcard(s) => vec![s.as_str()],
            Principal::Map(map) => {
                let mut out = Vec::new();
                for key in ["AWS", "Federated"] {
                    if let Some(values) = map.get(key) {
                        out.extend(values.iter());
                    }
                }
                out
            }
        }
    }

    /// Service principals (`{Service: "ec2.amazonaws.com"}`) with no
    /// `AWS`/`Federated` entry are intentionally never flagged by any
    /// principal-based check.
    pub fn is_service_only(&self) -> bool {
        match self {
            Principal::Wildcard(_) => false,
            Principal::Map(map) => {
                map.contains_key("Service")
                    && !map.contains_key("AWS")
                    && !map.contains_key("Federated")
            }
        }
    }
}

// ─── Statements ────────────────────────────────────────────────────

/// One policy statement. Every field is optional in the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PolicyStatement {
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(rename = "Effect", default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(rename = "Principal", default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(rename = "NotPrincipal", default, skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<Principal>,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<StringOrVec>,
    #[serde(rename = "NotAction", default, skip_serializing_if = "Option::is_none")]
    pub not_action: Option<StringOrVec>,
    #[serde(rename = "Resource", default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<StringOrVec>,
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl PolicyStatement {
    /// Only Allow statements are evaluated for risk. Deny statements
    /// are never flagged.
    pub fn is_allow(&self) -> bool {
        self.effect.as_deref() == Some("Allow")
    }
}

/// A policy document with its statements normalized to a list. The wire
/// format permits `Statement` to be a single object; deserialization
/// flattens that before anything evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "Statement", default, deserialize_with = "one_or_many_statements")]
    pub statement: Vec<PolicyStatement>,
}

fn one_or_many_statements<'de, D>(deserializer: D) -> Result<Vec<PolicyStatement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PolicyStatement),
        Many(Vec<PolicyStatement>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(statement) => vec![statement],
        OneOrMany::Many(statements) => statements,
    })
}

// ─── Risk taxonomy ─────────────────────────────────────────────────

/// The six risk categories a statement can trigger. Categories are
/// independent; one statement may appear under several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Principal is literally `"*"` or `{AWS: "*"}`.
    WildcardPrincipal,
    /// A principal from a different account than the resource owner.
    CrossAccountPrincipal,
    /// A principal account absent from the trusted-accounts allow-list.
    UntrustedPrincipal,
    /// `Action` contains `"*"`, or `NotAction` is present at all.
    WildcardActions,
    /// `Action` intersects the configured dangerous-actions list.
    DangerousActions,
    /// Wildcard principal without a narrowing condition, or
    /// `NotPrincipal` present.
    Unrestricted,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::WildcardPrincipal,
        RiskCategory::CrossAccountPrincipal,
        RiskCategory::UntrustedPrincipal,
        RiskCategory::WildcardActions,
        RiskCategory::DangerousActions,
        RiskCategory::Unrestricted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::WildcardPrincipal => "wildcard_principal",
            RiskCategory::CrossAccountPrincipal => "cross_account_principal",
            RiskCategory::UntrustedPrincipal => "untrusted_principal",
            RiskCategory::WildcardActions => "wildcard_actions",
            RiskCategory::DangerousActions => "dangerous_actions",
            RiskCategory::Unrestricted => "unrestricted",
        }
    }
}

/// Classifier output: triggering statements per category. Empty or
/// absent category means clean.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskReport {
    entries: BTreeMap<RiskCategory, Vec<PolicyStatement>>,
}

impl RiskReport {
    pub fn add(&mut self, category: RiskCategory, statement: &PolicyStatement) {
        self.entries
            .entry(category)
            .or_default()
            .push(statement.clone());
    }

    pub fn contains(&self, category: RiskCategory) -> bool {
        self.entries
            .get(&category)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    pub fn statements(&self, category: RiskCategory) -> &[PolicyStatement] {
        self.entries
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_clean(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Fold another report into this one, category by category.
    pub fn merge(&mut self, other: RiskReport) {
        for (category, statements) in other.entries {
            self.entries.entry(category).or_default().extend(statements);
        }
    }

    /// Count of triggering statements per category, for reporting.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        self.entries
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_statement_normalizes_to_list() {
        let doc: PolicyDocument = serde_json::from_value(json!({
            "Version": "2012-10-17",
            "Statement": {"Effect": "Allow", "Action": "s3:GetObject", "Principal": "*"}
        }))
        .unwrap();
        assert_eq!(doc.statement.len(), 1);
        assert!(doc.statement[0].is_allow());
    }

    #[test]
    fn statement_list_parses_mixed_fields() {
        let doc: PolicyDocument = serde_json::from_value(json!({
            "Statement": [
                {"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"],
                 "Principal": {"AWS": ["arn:aws:iam::111122223333:root"]}},
                {"Effect": "Deny", "NotAction": "iam:*"}
            ]
        }))
        .unwrap();
        assert_eq!(doc.statement.len(), 2);
        assert!(!doc.statement[1].is_allow());
        assert!(doc.statement[1].not_action.is_some());
    }

    #[test]
    fn wildcard_principal_shapes() {
        let bare: Principal = serde_json::from_value(json!("*")).unwrap();
        let keyed: Principal = serde_json::from_value(json!({"AWS": "*"})).unwrap();
        let account: Principal =
            serde_json::from_value(json!({"AWS": "arn:aws:iam::111122223333:root"})).unwrap();
        assert!(bare.is_wildcard());
        assert!(keyed.is_wildcard());
        assert!(!account.is_wildcard());
    }

    #[test]
    fn service_only_principal_has_no_candidates_to_flag() {
        let p: Principal =
            serde_json::from_value(json!({"Service": "lambda.amazonaws.com"})).unwrap();
        assert!(p.is_service_only());
        assert!(p.account_candidates().is_empty());
    }

    #[test]
    fn federated_counts_as_account_candidate() {
        let p: Principal = serde_json::from_value(
            json!({"Federated": "arn:aws:iam::444455556666:saml-provider/corp"}),
        )
        .unwrap();
        assert_eq!(
            p.account_candidates(),
            vec!["arn:aws:iam::444455556666:saml-provider/corp"]
        );
    }
}
