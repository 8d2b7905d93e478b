//! Access dimension — who can act on this resource, and how broadly
//!
//! Runs the policy risk classifier over every policy document reachable
//! from the record: the resource's own resource policy, its inline and
//! attached identity policies, and one hop through associations, the
//! policies of any associated IAM role. All triggered categories
//! collapse into a single label by fixed priority.

use super::DimensionOutcome;
use crate::model::{ResourceRecord, Value};
use crate::policy::{PolicyClassifier, PolicyDocument, RiskCategory, RiskReport};
use serde_json::json;

/// Config keys holding policy documents on a record.
const RESOURCE_POLICY_KEY: &str = "resource_policy";
const INLINE_POLICIES_KEY: &str = "inline_policies";
const ATTACHED_POLICIES_KEY: &str = "attached_policies";
/// A drilled IAM managed policy carries its default version here.
const POLICY_DOCUMENT_KEY: &str = "policy_document";

/// Priority ladder: the first triggered category wins the label.
const PRIORITY: &[(RiskCategory, &str)] = &[
    (RiskCategory::Unrestricted, "unrestricted"),
    (RiskCategory::UntrustedPrincipal, "untrusted-principal"),
    (RiskCategory::DangerousActions, "dangerous-actions"),
    (RiskCategory::WildcardActions, "unrestricted-actions"),
    (RiskCategory::CrossAccountPrincipal, "cross-account-principal"),
    (RiskCategory::WildcardPrincipal, "unrestricted-principal"),
];

pub fn assess_access(
    record: &ResourceRecord,
    account_id: &str,
    trusted_accounts: &[String],
    dangerous_actions: &[String],
) -> DimensionOutcome {
    if record.is_unresolved() {
        return DimensionOutcome::unknown();
    }

    let classifier = PolicyClassifier::new(account_id, trusted_accounts, dangerous_actions);
    let mut report = RiskReport::default();

    for document in collect_documents(record) {
        report.merge(classifier.classify(&document));
    }

    let label = PRIORITY
        .iter()
        .find(|(category, _)| report.contains(*category))
        .map(|(_, label)| *label)
        .unwrap_or("restricted");

    let mut outcome = DimensionOutcome::label(label);
    for (category, count) in report.counts() {
        outcome = outcome.with_detail(category, json!(count));
    }
    outcome
}

/// Every policy document reachable from the record: its own policies,
/// then one level into associated IAM roles and their drilled managed
/// policies.
fn collect_documents(record: &ResourceRecord) -> Vec<PolicyDocument> {
    let mut documents = Vec::new();
    collect_from_config(record, &mut documents);

    for role in record.resolved("iam_roles") {
        collect_from_config(role, &mut documents);
        for policy in role.resolved("iam_policies") {
            if let Some(value) = policy.config.get(POLICY_DOCUMENT_KEY) {
                push_document(value, &policy.arn, &mut documents);
            }
        }
    }
    for policy in record.resolved("iam_policies") {
        if let Some(value) = policy.config.get(POLICY_DOCUMENT_KEY) {
            push_document(value, &policy.arn, &mut documents);
        }
    }
    documents
}

fn collect_from_config(record: &ResourceRecord, documents: &mut Vec<PolicyDocument>) {
    if let Some(value) = record.config.get(RESOURCE_POLICY_KEY) {
        push_document(value, &record.arn, documents);
    }
    for key in [INLINE_POLICIES_KEY, ATTACHED_POLICIES_KEY] {
        match record.config.get(key) {
            Some(Value::Array(items)) => {
                for item in items {
                    push_document(item, &record.arn, documents);
                }
            }
            Some(Value::Object(by_name)) => {
                for item in by_name.values() {
                    push_document(item, &record.arn, documents);
                }
            }
            _ => {}
        }
    }
}

/// Parse one document value; malformed input is logged and skipped so
/// the remaining documents still get evaluated.
fn push_document(value: &Value, origin: &str, documents: &mut Vec<PolicyDocument>) {
    if value.is_null() || value.as_bool() == Some(false) {
        return;
    }
    match serde_json::from_value::<PolicyDocument>(value.clone()) {
        Ok(document) => documents.push(document),
        Err(e) => {
            tracing::warn!("Skipping malformed policy document on {}: {}", origin, e);
        }
    }
}
