//! Security-group rule classifier — unrestricted ingress/egress
//!
//! The same shape of problem as the policy classifier, over flattened
//! ingress/egress rule records instead of statements: a rule open to
//! `0.0.0.0/0` or `::/0` is unrestricted in its direction.

use serde::{Deserialize, Serialize};

/// One flattened security-group rule. Port and protocol fields ride
/// along for reporting; the classifier only looks at CIDRs and
/// direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    #[serde(default)]
    pub cidr_ipv4: Option<String>,
    #[serde(default)]
    pub cidr_ipv6: Option<String>,
    #[serde(default)]
    pub is_egress: bool,
    #[serde(default)]
    pub from_port: Option<i64>,
    #[serde(default)]
    pub to_port: Option<i64>,
    #[serde(default)]
    pub ip_protocol: Option<String>,
}

impl SecurityGroupRule {
    fn is_open_to_internet(&self) -> bool {
        let v4_open = self.cidr_ipv4.as_deref() == Some("0.0.0.0/0");
        let v6_open = self.cidr_ipv6.as_deref() == Some("::/0");
        v4_open || v6_open
    }
}

/// Unrestricted rules per direction. Empty lists mean clean.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleReport {
    pub unrestricted_ingress: Vec<SecurityGroupRule>,
    pub unrestricted_egress: Vec<SecurityGroupRule>,
}

impl RuleReport {
    pub fn is_clean(&self) -> bool {
        self.unrestricted_ingress.is_empty() && self.unrestricted_egress.is_empty()
    }
}

/// Classify a flat rule list, dropping exact duplicate rules first.
pub fn classify_rules(rules: &[SecurityGroupRule]) -> RuleReport {
    let mut seen: Vec<&SecurityGroupRule> = Vec::new();
    let mut report = RuleReport::default();

    for rule in rules {
        if seen.contains(&rule) {
            continue;
        }
        seen.push(rule);

        if !rule.is_open_to_internet() {
            continue;
        }
        if rule.is_egress {
            report.unrestricted_egress.push(rule.clone());
        } else {
            report.unrestricted_ingress.push(rule.clone());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(cidr_v4: Option<&str>, cidr_v6: Option<&str>, egress: bool) -> SecurityGroupRule {
        SecurityGroupRule {
            cidr_ipv4: cidr_v4.map(str::to_string),
            cidr_ipv6: cidr_v6.map(str::to_string),
            is_egress: egress,
            from_port: Some(443),
            to_port: Some(443),
            ip_protocol: Some("tcp".to_string()),
        }
    }

    #[test]
    fn open_ingress_is_flagged() {
        let report = classify_rules(&[rule(Some("0.0.0.0/0"), None, false)]);
        assert_eq!(report.unrestricted_ingress.len(), 1);
        assert!(report.unrestricted_egress.is_empty());
    }

    #[test]
    fn ipv6_open_egress_is_flagged_in_its_direction() {
        let report = classify_rules(&[rule(None, Some("::/0"), true)]);
        assert!(report.unrestricted_ingress.is_empty());
        assert_eq!(report.unrestricted_egress.len(), 1);
    }

    #[test]
    fn restricted_cidrs_are_clean() {
        let report = classify_rules(&[
            rule(Some("10.0.0.0/8"), None, false),
            rule(None, Some("2001:db8::/32"), false),
        ]);
        assert!(report.is_clean());
    }

    #[test]
    fn identical_rules_deduplicate() {
        let open = rule(Some("0.0.0.0/0"), None, false);
        let report = classify_rules(&[open.clone(), open.clone(), open]);
        assert_eq!(report.unrestricted_ingress.len(), 1);
    }
}
