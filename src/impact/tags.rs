//! Environment, application and owner dimensions
//!
//! All three are the same classifier over different tables: match the
//! finding's resource tags (case-insensitive on values) or the owning
//! account against configured label rules. The first matching label in
//! table order wins; no match means `unknown`.

use super::DimensionOutcome;
use crate::config::LabelTable;
use serde_json::json;
use std::collections::BTreeMap;

pub fn assess_environment(
    table: &LabelTable,
    tags: &BTreeMap<String, String>,
    account_id: &str,
) -> DimensionOutcome {
    match_label_table(table, tags, account_id)
}

pub fn assess_application(
    table: &LabelTable,
    tags: &BTreeMap<String, String>,
    account_id: &str,
) -> DimensionOutcome {
    match_label_table(table, tags, account_id)
}

pub fn assess_owner(
    table: &LabelTable,
    tags: &BTreeMap<String, String>,
    account_id: &str,
) -> DimensionOutcome {
    match_label_table(table, tags, account_id)
}

fn match_label_table(
    table: &LabelTable,
    tags: &BTreeMap<String, String>,
    account_id: &str,
) -> DimensionOutcome {
    for (label, rule) in table {
        for (tag_key, accepted) in &rule.tags {
            if let Some(value) = tags.get(tag_key) {
                if accepted.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                    return DimensionOutcome::label(label)
                        .with_detail("tag", json!(format!("{}={}", tag_key, value)));
                }
            }
        }
        if rule.accounts.iter().any(|a| a == account_id) {
            return DimensionOutcome::label(label).with_detail("account", json!(account_id));
        }
    }
    DimensionOutcome::unknown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelRule;

    fn table() -> LabelTable {
        let mut table = LabelTable::new();
        table.insert(
            "production".to_string(),
            LabelRule {
                tags: [("Environment".to_string(), vec!["prod".to_string()])].into(),
                accounts: vec!["999999999999".to_string()],
            },
        );
        table
    }

    #[test]
    fn tag_value_match_is_case_insensitive() {
        let tags: BTreeMap<String, String> =
            [("Environment".to_string(), "PROD".to_string())].into();
        let outcome = assess_environment(&table(), &tags, "111122223333");
        assert_eq!(outcome.label, "production");
        assert_eq!(outcome.details["tag"], json!("Environment=PROD"));
    }

    #[test]
    fn account_match_without_tags() {
        let outcome = assess_environment(&table(), &BTreeMap::new(), "999999999999");
        assert_eq!(outcome.label, "production");
    }

    #[test]
    fn no_match_is_unknown() {
        let tags: BTreeMap<String, String> =
            [("Environment".to_string(), "qa".to_string())].into();
        assert!(assess_environment(&table(), &tags, "111122223333").is_unknown());
    }

    #[test]
    fn empty_table_is_always_unknown() {
        let empty = LabelTable::new();
        assert!(assess_owner(&empty, &BTreeMap::new(), "111122223333").is_unknown());
    }
}
