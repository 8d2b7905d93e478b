//! Policy risk classifier — six heuristic predicates over statements
//!
//! This is advisory pattern matching, not an IAM simulator: each Allow
//! statement is checked against dangerous authorization shapes and the
//! triggering statements are collected per category. Deny statements
//! are never evaluated.

use super::{PolicyDocument, PolicyStatement, RiskCategory, RiskReport};
use serde_json::Value;

/// Principal strings that name an AWS service alias rather than an
/// account. These never count as cross-account or untrusted.
const SERVICE_ALIASES: &[&str] = &["cloudfront"];

/// Evaluates policy documents for one resource owner.
pub struct PolicyClassifier<'a> {
    account_id: &'a str,
    trusted_accounts: &'a [String],
    dangerous_actions: &'a [String],
}

impl<'a> PolicyClassifier<'a> {
    pub fn new(
        account_id: &'a str,
        trusted_accounts: &'a [String],
        dangerous_actions: &'a [String],
    ) -> Self {
        Self {
            account_id,
            trusted_accounts,
            dangerous_actions,
        }
    }

    /// Classify every Allow statement of a document. Categories are
    /// evaluated independently; a statement can land in several.
    pub fn classify(&self, document: &PolicyDocument) -> RiskReport {
        let mut report = RiskReport::default();
        for statement in document.statement.iter().filter(|s| s.is_allow()) {
            self.classify_statement(statement, &mut report);
        }
        report
    }

    fn classify_statement(&self, statement: &PolicyStatement, report: &mut RiskReport) {
        if self.is_wildcard_principal(statement) {
            report.add(RiskCategory::WildcardPrincipal, statement);
        }
        if self.is_cross_account(statement) {
            report.add(RiskCategory::CrossAccountPrincipal, statement);
        }
        if self.is_untrusted(statement) {
            report.add(RiskCategory::UntrustedPrincipal, statement);
        }
        if self.is_wildcard_actions(statement) {
            report.add(RiskCategory::WildcardActions, statement);
        }
        if self.is_dangerous_actions(statement) {
            report.add(RiskCategory::DangerousActions, statement);
        }
        if self.is_unrestricted(statement) {
            report.add(RiskCategory::Unrestricted, statement);
        }
    }

    // ── Predicates ─────────────────────────────────────────────────

    fn is_wildcard_principal(&self, statement: &PolicyStatement) -> bool {
        statement
            .principal
            .as_ref()
            .map(|p| p.is_wildcard())
            .unwrap_or(false)
    }

    fn is_cross_account(&self, statement: &PolicyStatement) -> bool {
        self.principal_accounts(statement)
            .iter()
            .any(|account| account != self.account_id)
    }

    fn is_untrusted(&self, statement: &PolicyStatement) -> bool {
        // An empty allow-list means "no trust policy configured", not
        // "trust nothing"; the check is a no-op then.
        if self.trusted_accounts.is_empty() {
            return false;
        }
        self.principal_accounts(statement)
            .iter()
            .any(|account| !self.trusted_accounts.iter().any(|t| t == account))
    }

    fn is_wildcard_actions(&self, statement: &PolicyStatement) -> bool {
        // NotAction means "every action except these", which is always
        // broader than anything listed explicitly.
        if statement.not_action.is_some() {
            return true;
        }
        statement
            .action
            .as_ref()
            .map(|a| a.contains("*"))
            .unwrap_or(false)
    }

    fn is_dangerous_actions(&self, statement: &PolicyStatement) -> bool {
        let actions = match &statement.action {
            Some(a) => a,
            None => return false,
        };
        actions.iter().any(|action| {
            self.dangerous_actions
                .iter()
                .any(|d| d.eq_ignore_ascii_case(action))
        })
    }

    fn is_unrestricted(&self, statement: &PolicyStatement) -> bool {
        if statement.not_principal.is_some() {
            // "All principals except the named ones."
            return true;
        }
        if !self.is_wildcard_principal(statement) {
            return false;
        }
        match &statement.condition {
            None => true,
            Some(condition) => !condition_narrows_source_ip(condition),
        }
    }

    /// Account ids extracted from the statement's principal candidates.
    /// Malformed principals are logged and skipped, never flagged.
    fn principal_accounts(&self, statement: &PolicyStatement) -> Vec<String> {
        let principal = match &statement.principal {
            Some(p) if !p.is_service_only() => p,
            _ => return Vec::new(),
        };
        principal
            .account_candidates()
            .into_iter()
            .filter_map(|candidate| principal_account_id(candidate, &statement.sid))
            .collect()
    }
}

/// The account-id field of a principal identifier: the 5th `:`-delimited
/// segment of an ARN, or the identifier itself if it is a bare account
/// id. `"*"` and service aliases yield nothing.
fn principal_account_id(principal: &str, sid: &Option<String>) -> Option<String> {
    if principal == "*" || SERVICE_ALIASES.contains(&principal) {
        return None;
    }
    if principal.len() == 12 && principal.bytes().all(|b| b.is_ascii_digit()) {
        return Some(principal.to_string());
    }
    if principal.starts_with("arn:") {
        let account = principal.split(':').nth(4).unwrap_or("");
        if !account.is_empty() && account.bytes().all(|b| b.is_ascii_digit()) {
            return Some(account.to_string());
        }
    }
    tracing::warn!(
        "Skipping malformed principal {:?} in statement {:?}",
        principal,
        sid.as_deref().unwrap_or("<no sid>")
    );
    None
}

/// Whether a Condition block narrows access by source IP to something
/// tighter than the whole internet. Only `IpAddress`-family operators
/// on `aws:SourceIp` count, and a `/0` range does not narrow anything.
fn condition_narrows_source_ip(condition: &Value) -> bool {
    let operators = match condition.as_object() {
        Some(map) => map,
        None => return false,
    };
    for (operator, block) in operators {
        if !operator.starts_with("IpAddress") {
            continue;
        }
        let entries = match block.as_object() {
            Some(map) => map,
            None => continue,
        };
        for (key, value) in entries {
            if !key.eq_ignore_ascii_case("aws:sourceip") {
                continue;
            }
            let cidrs: Vec<&str> = match value {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            if !cidrs.is_empty() && cidrs.iter().all(|c| !is_whole_internet(c)) {
                return true;
            }
        }
    }
    false
}

fn is_whole_internet(cidr: &str) -> bool {
    cidr == "0.0.0.0/0" || cidr == "::/0" || cidr.ends_with("/0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OWNER: &str = "222222222222";

    fn classify(doc: serde_json::Value, trusted: &[&str], dangerous: &[&str]) -> RiskReport {
        let trusted: Vec<String> = trusted.iter().map(|s| s.to_string()).collect();
        let dangerous: Vec<String> = dangerous.iter().map(|s| s.to_string()).collect();
        let document: PolicyDocument = serde_json::from_value(doc).unwrap();
        PolicyClassifier::new(OWNER, &trusted, &dangerous).classify(&document)
    }

    #[test]
    fn wildcard_statement_is_both_wildcard_and_unrestricted() {
        let report = classify(
            json!({"Statement": {"Effect": "Allow", "Principal": "*", "Action": "s3:GetObject"}}),
            &[],
            &[],
        );
        assert!(report.contains(RiskCategory::WildcardPrincipal));
        assert!(report.contains(RiskCategory::Unrestricted));
        assert!(!report.contains(RiskCategory::WildcardActions));
    }

    #[test]
    fn deny_statements_are_never_flagged() {
        let report = classify(
            json!({"Statement": {"Effect": "Deny", "Principal": "*", "Action": "*"}}),
            &[],
            &[],
        );
        assert!(report.is_clean());
    }

    #[test]
    fn cross_account_flagged_only_for_foreign_owner() {
        let doc = json!({"Statement": {
            "Effect": "Allow",
            "Principal": {"AWS": "arn:aws:iam::111111111111:root"},
            "Action": "sts:AssumeRole"
        }});
        let foreign = classify(doc.clone(), &[], &[]);
        assert!(foreign.contains(RiskCategory::CrossAccountPrincipal));

        let document: PolicyDocument = serde_json::from_value(doc).unwrap();
        let own = PolicyClassifier::new("111111111111", &[], &[]).classify(&document);
        assert!(!own.contains(RiskCategory::CrossAccountPrincipal));
    }

    #[test]
    fn empty_trusted_accounts_disables_untrusted_check() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow",
                "Principal": {"AWS": "arn:aws:iam::999999999999:root"},
                "Action": "s3:GetObject"
            }}),
            &[],
            &[],
        );
        assert!(!report.contains(RiskCategory::UntrustedPrincipal));
    }

    #[test]
    fn untrusted_principal_with_nonempty_allowlist() {
        let doc = json!({"Statement": {
            "Effect": "Allow",
            "Principal": {"AWS": "arn:aws:iam::999999999999:root"},
            "Action": "s3:GetObject"
        }});
        let report = classify(doc.clone(), &["111111111111"], &[]);
        assert!(report.contains(RiskCategory::UntrustedPrincipal));

        let report = classify(doc, &["999999999999"], &[]);
        assert!(!report.contains(RiskCategory::UntrustedPrincipal));
    }

    #[test]
    fn not_action_presence_is_wildcard_actions() {
        let report = classify(
            json!({"Statement": {"Effect": "Allow", "NotAction": "iam:DeleteRole", "Principal": {"AWS": "arn:aws:iam::222222222222:root"}}}),
            &[],
            &[],
        );
        assert!(report.contains(RiskCategory::WildcardActions));
    }

    #[test]
    fn dangerous_actions_intersection() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow",
                "Principal": {"AWS": "arn:aws:iam::222222222222:root"},
                "Action": ["s3:ListBucket", "iam:PassRole"]
            }}),
            &[],
            &["iam:PassRole", "sts:AssumeRole"],
        );
        assert!(report.contains(RiskCategory::DangerousActions));

        let flagged = report.statements(RiskCategory::DangerousActions);
        assert_eq!(flagged.len(), 1);
        assert!(flagged[0].action.as_ref().unwrap().contains("iam:PassRole"));
        assert!(report.statements(RiskCategory::Unrestricted).is_empty());
    }

    #[test]
    fn source_ip_condition_defuses_unrestricted() {
        let narrowed = classify(
            json!({"Statement": {
                "Effect": "Allow", "Principal": "*", "Action": "s3:GetObject",
                "Condition": {"IpAddress": {"aws:SourceIp": "203.0.113.0/24"}}
            }}),
            &[],
            &[],
        );
        assert!(narrowed.contains(RiskCategory::WildcardPrincipal));
        assert!(!narrowed.contains(RiskCategory::Unrestricted));

        let whole_internet = classify(
            json!({"Statement": {
                "Effect": "Allow", "Principal": "*", "Action": "s3:GetObject",
                "Condition": {"IpAddress": {"aws:SourceIp": ["0.0.0.0/0"]}}
            }}),
            &[],
            &[],
        );
        assert!(whole_internet.contains(RiskCategory::Unrestricted));

        let unrelated = classify(
            json!({"Statement": {
                "Effect": "Allow", "Principal": "*", "Action": "s3:GetObject",
                "Condition": {"StringEquals": {"aws:PrincipalOrgID": "o-abc123"}}
            }}),
            &[],
            &[],
        );
        assert!(unrelated.contains(RiskCategory::Unrestricted));
    }

    #[test]
    fn not_principal_is_always_unrestricted() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow",
                "NotPrincipal": {"AWS": "arn:aws:iam::222222222222:root"},
                "Action": "s3:GetObject"
            }}),
            &[],
            &[],
        );
        assert!(report.contains(RiskCategory::Unrestricted));
    }

    #[test]
    fn service_principal_never_flagged() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow",
                "Principal": {"Service": "cloudtrail.amazonaws.com"},
                "Action": "s3:PutObject"
            }}),
            &["111111111111"],
            &[],
        );
        assert!(!report.contains(RiskCategory::CrossAccountPrincipal));
        assert!(!report.contains(RiskCategory::UntrustedPrincipal));
        assert!(!report.contains(RiskCategory::WildcardPrincipal));
    }

    #[test]
    fn malformed_principal_skipped_not_flagged() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow",
                "Principal": {"AWS": "not-an-arn-at-all"},
                "Action": "s3:GetObject"
            }}),
            &["111111111111"],
            &[],
        );
        assert!(!report.contains(RiskCategory::CrossAccountPrincipal));
        assert!(!report.contains(RiskCategory::UntrustedPrincipal));
    }

    #[test]
    fn statement_can_trigger_multiple_categories() {
        let report = classify(
            json!({"Statement": {
                "Effect": "Allow", "Principal": "*", "Action": "*"
            }}),
            &[],
            &[],
        );
        assert!(report.contains(RiskCategory::WildcardPrincipal));
        assert!(report.contains(RiskCategory::WildcardActions));
        assert!(report.contains(RiskCategory::Unrestricted));
        assert_eq!(report.counts().len(), 3);
    }
}
