//! External configuration — `cumulo.toml`
//!
//! Everything operators tune lives here: the trusted-accounts
//! allow-list, the dangerous-actions list, tag/account tables for the
//! environment, application and owner dimensions, and the impact
//! weights table that drives the aggregator. Every field has a default
//! so a missing file degrades to the built-in tables.

use crate::model::Value;
use crate::{CumuloError, CumuloResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ─── Tag / account tables ──────────────────────────────────────────

/// One label's matching rule for the tag-based dimensions. A resource
/// matches when any configured tag key carries one of the listed values
/// (case-insensitive), or its account id appears in `accounts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelRule {
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// Label → rule. Iteration order is the map's key order; the first
/// matching label wins.
pub type LabelTable = BTreeMap<String, LabelRule>;

// ─── Impact weights table ──────────────────────────────────────────

/// Score and matchers for one label of one dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub score: f64,
    #[serde(default)]
    pub matchers: Vec<String>,
}

/// Weight and per-label scores for one dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub weight: f64,
    #[serde(default)]
    pub values: BTreeMap<String, LabelScore>,
}

/// The aggregator's external rules table:
/// `{dimension: {weight, values: {label: {score, matchers}}}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactTable(pub BTreeMap<String, DimensionWeights>);

impl ImpactTable {
    /// A malformed table must disable scoring rather than miscompute.
    /// Scores must sit in [0, 1]; weights must be finite and
    /// non-negative.
    pub fn validate(&self) -> CumuloResult<()> {
        for (dimension, weights) in &self.0 {
            if !weights.weight.is_finite() || weights.weight < 0.0 {
                return Err(CumuloError::ConfigError(format!(
                    "invalid weight {} for dimension {}",
                    weights.weight, dimension
                )));
            }
            for (label, entry) in &weights.values {
                if !entry.score.is_finite() || !(0.0..=1.0).contains(&entry.score) {
                    return Err(CumuloError::ConfigError(format!(
                        "score {} out of range for {}.{}",
                        entry.score, dimension, label
                    )));
                }
            }
        }
        Ok(())
    }

    /// Weight and score for an emitted label, if the table knows it.
    /// A label matches its entry by key or through the entry's
    /// `matchers` list; unmatched labels exclude the dimension from
    /// aggregation entirely.
    pub fn lookup(&self, dimension: &str, label: &str) -> Option<(f64, f64)> {
        let weights = self.0.get(dimension)?;
        for (value_label, entry) in &weights.values {
            if value_label == label || entry.matchers.iter().any(|m| m == label) {
                return Some((weights.weight, entry.score));
            }
        }
        None
    }
}

impl Default for ImpactTable {
    fn default() -> Self {
        default_impact_table()
    }
}

// ─── Check filtering ───────────────────────────────────────────────

/// How multiple check filters combine. `All` is the default; `Any`
/// exists as an explicit mode and is kept rather than inferred away,
/// pending a decision on surfacing it to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    All,
    Any,
}

impl FilterMode {
    pub fn combine(&self, matches: impl IntoIterator<Item = bool>) -> bool {
        let mut iter = matches.into_iter();
        match self {
            FilterMode::All => iter.all(|m| m),
            FilterMode::Any => iter.any(|m| m),
        }
    }
}

// ─── Top-level configuration ───────────────────────────────────────

/// Everything the engine reads from `cumulo.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Accounts allowed as principals without an untrusted flag. Empty
    /// disables the untrusted-principal check.
    #[serde(default)]
    pub trusted_accounts: Vec<String>,

    /// Sensitive action identifiers for the dangerous-actions check.
    #[serde(default = "default_dangerous_actions")]
    pub dangerous_actions: Vec<String>,

    /// Tag/account tables for the environment dimension.
    #[serde(default = "default_environments")]
    pub environments: LabelTable,

    /// Tag/account tables for the application dimension.
    #[serde(default)]
    pub applications: LabelTable,

    /// Tag/account tables for the owner dimension.
    #[serde(default)]
    pub owners: LabelTable,

    /// The aggregator's weights table.
    #[serde(default)]
    pub impact: ImpactTable,

    /// Config checks a record must match to be reported at all. Empty
    /// means no filtering.
    #[serde(default)]
    pub check_filters: BTreeMap<String, Value>,

    /// How `check_filters` combine.
    #[serde(default)]
    pub filter_mode: FilterMode,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            trusted_accounts: Vec::new(),
            dangerous_actions: default_dangerous_actions(),
            environments: default_environments(),
            applications: LabelTable::new(),
            owners: LabelTable::new(),
            impact: default_impact_table(),
            check_filters: BTreeMap::new(),
            filter_mode: FilterMode::All,
        }
    }
}

impl ContextConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> CumuloResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ContextConfig = toml::from_str(&content)
            .map_err(|e| CumuloError::ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Try `cumulo.toml` in the given directory, fall back to defaults.
    pub fn from_project_root(root: &Path) -> Self {
        let config_path = root.join("cumulo.toml");
        if config_path.exists() {
            match Self::from_file(&config_path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to load {}: {}, using defaults",
                        config_path.display(),
                        e
                    );
                }
            }
        }
        Self::default()
    }
}

// ─── Built-in defaults ─────────────────────────────────────────────

/// Actions that grant admin-like, escalation-capable or data-exposing
/// access. Operators extend or replace this list per deployment.
pub fn default_dangerous_actions() -> Vec<String> {
    [
        "iam:*",
        "iam:CreateUser",
        "iam:CreateRole",
        "iam:AttachUserPolicy",
        "iam:AttachRolePolicy",
        "iam:PutUserPolicy",
        "iam:PutRolePolicy",
        "iam:CreateAccessKey",
        "iam:CreateLoginProfile",
        "iam:UpdateLoginProfile",
        "iam:PassRole",
        "sts:AssumeRole",
        "lambda:CreateFunction",
        "lambda:UpdateFunctionCode",
        "ec2:RunInstances",
        "s3:PutBucketPolicy",
        "kms:Decrypt",
        "kms:CreateGrant",
        "secretsmanager:GetSecretValue",
        "ssm:GetParameter",
        "organizations:*",
        "cloudtrail:StopLogging",
        "cloudtrail:DeleteTrail",
        "guardduty:DeleteDetector",
        "config:StopConfigurationRecorder",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_environments() -> LabelTable {
    let mut table = LabelTable::new();
    for (label, values) in [
        ("production", vec!["prod", "production", "prd"]),
        ("staging", vec!["staging", "stage", "stg"]),
        ("development", vec!["dev", "development", "test", "sandbox"]),
    ] {
        let mut tags = BTreeMap::new();
        let values: Vec<String> = values.into_iter().map(str::to_string).collect();
        tags.insert("Environment".to_string(), values.clone());
        tags.insert("environment".to_string(), values.clone());
        tags.insert("Env".to_string(), values);
        table.insert(label.to_string(), LabelRule { tags, accounts: Vec::new() });
    }
    table
}

fn score(score: f64) -> LabelScore {
    LabelScore { score, matchers: Vec::new() }
}

/// The built-in weights table. `unknown` is deliberately absent from
/// every dimension's values: an unknown label excludes the dimension
/// from aggregation instead of dragging the score toward zero.
pub fn default_impact_table() -> ImpactTable {
    static TABLE: Lazy<ImpactTable> = Lazy::new(build_default_impact_table);
    TABLE.clone()
}

fn build_default_impact_table() -> ImpactTable {
    let mut table = BTreeMap::new();

    table.insert(
        "exposure".to_string(),
        DimensionWeights {
            weight: 10.0,
            values: [
                ("effectively-public".to_string(), score(1.0)),
                ("restricted-public".to_string(), score(0.7)),
                ("unrestricted-private".to_string(), score(0.4)),
                ("restricted".to_string(), score(0.0)),
            ]
            .into(),
        },
    );

    table.insert(
        "access".to_string(),
        DimensionWeights {
            weight: 4.0,
            values: [
                ("unrestricted".to_string(), score(1.0)),
                ("untrusted-principal".to_string(), score(0.8)),
                ("dangerous-actions".to_string(), score(0.7)),
                ("unrestricted-actions".to_string(), score(0.6)),
                ("cross-account-principal".to_string(), score(0.5)),
                ("unrestricted-principal".to_string(), score(0.4)),
                ("restricted".to_string(), score(0.0)),
            ]
            .into(),
        },
    );

    table.insert(
        "encryption".to_string(),
        DimensionWeights {
            weight: 4.0,
            values: [
                ("unencrypted".to_string(), score(1.0)),
                ("encrypted".to_string(), score(0.0)),
            ]
            .into(),
        },
    );

    table.insert(
        "status".to_string(),
        DimensionWeights {
            weight: 3.0,
            values: [
                ("attached".to_string(), score(1.0)),
                ("running".to_string(), score(1.0)),
                ("not-attached".to_string(), score(0.0)),
                ("not-running".to_string(), score(0.0)),
            ]
            .into(),
        },
    );

    table.insert(
        "environment".to_string(),
        DimensionWeights {
            weight: 3.0,
            values: [
                ("production".to_string(), score(1.0)),
                ("staging".to_string(), score(0.3)),
                ("development".to_string(), score(0.2)),
            ]
            .into(),
        },
    );

    ImpactTable(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_validates() {
        assert!(default_impact_table().validate().is_ok());
    }

    #[test]
    fn out_of_range_score_rejected() {
        let mut table = default_impact_table();
        table
            .0
            .get_mut("exposure")
            .unwrap()
            .values
            .insert("effectively-public".to_string(), score(1.5));
        assert!(table.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut table = default_impact_table();
        table.0.get_mut("encryption").unwrap().weight = -1.0;
        assert!(table.validate().is_err());
    }

    #[test]
    fn lookup_honors_matchers() {
        let mut table = default_impact_table();
        table
            .0
            .get_mut("exposure")
            .unwrap()
            .values
            .get_mut("effectively-public")
            .unwrap()
            .matchers
            .push("internet-facing".to_string());

        assert_eq!(table.lookup("exposure", "internet-facing"), Some((10.0, 1.0)));
        assert_eq!(table.lookup("exposure", "unknown"), None);
        assert_eq!(table.lookup("no-such-dimension", "anything"), None);
    }

    #[test]
    fn filter_modes_combine_differently() {
        assert!(FilterMode::All.combine([true, true]));
        assert!(!FilterMode::All.combine([true, false]));
        assert!(FilterMode::Any.combine([true, false]));
        assert!(!FilterMode::Any.combine([false, false]));
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ContextConfig::from_project_root(dir.path());
        assert!(config.trusted_accounts.is_empty());
        assert!(!config.dangerous_actions.is_empty());
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cumulo.toml");
        std::fs::write(
            &path,
            r#"
trusted_accounts = ["111122223333"]

[environments.production.tags]
Environment = ["prod"]

[impact.exposure]
weight = 10.0

[impact.exposure.values.effectively-public]
score = 1.0
matchers = ["internet-facing"]
"#,
        )
        .unwrap();

        let config = ContextConfig::from_project_root(dir.path());
        assert_eq!(config.trusted_accounts, vec!["111122223333"]);
        assert_eq!(config.impact.lookup("exposure", "internet-facing"), Some((10.0, 1.0)));
    }
}
