//! Encryption dimension — is data at rest and in transit protected
//!
//! Evidence comes from resource-type-specific config keys plus the
//! `encrypted` flag of any associated volume or snapshot. One explicit
//! negative anywhere makes the resource `unencrypted`; `unknown` is
//! reserved for the case of no evidence at all.

use super::DimensionOutcome;
use crate::model::{tri_state, ResourceRecord};
use serde_json::json;

/// Config keys that carry encryption evidence. A key that is absent or
/// null contributes nothing; `false` is an explicit negative.
const ENCRYPTION_KEYS: &[&str] = &[
    "encrypted",
    "at_rest_encryption",
    "transit_encryption",
    "bucket_encryption",
    "storage_encrypted",
    "node_to_node_encryption",
];

/// Association kinds whose drilled records carry an `encrypted` flag.
const ENCRYPTED_ASSOCIATION_KINDS: &[&str] = &["volumes", "snapshots"];

pub fn assess_encryption(record: &ResourceRecord) -> DimensionOutcome {
    if record.is_unresolved() {
        return DimensionOutcome::unknown();
    }

    let mut any_evidence = false;
    let mut negatives: Vec<String> = Vec::new();

    for key in ENCRYPTION_KEYS {
        match tri_state(&record.config, key) {
            Some(true) => any_evidence = true,
            Some(false) => {
                any_evidence = true;
                negatives.push((*key).to_string());
            }
            None => {}
        }
    }

    for kind in ENCRYPTED_ASSOCIATION_KINDS {
        for related in record.resolved(kind) {
            match tri_state(&related.config, "encrypted") {
                Some(true) => any_evidence = true,
                Some(false) => {
                    any_evidence = true;
                    negatives.push(related.arn.clone());
                }
                None => {}
            }
        }
    }

    if !any_evidence {
        return DimensionOutcome::unknown();
    }
    if negatives.is_empty() {
        DimensionOutcome::label("encrypted")
    } else {
        DimensionOutcome::label("unencrypted").with_detail("unencrypted", json!(negatives))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssociationSlot;
    use serde_json::json;

    #[test]
    fn all_affirmative_evidence_is_encrypted() {
        let mut record = ResourceRecord::new("arn:aws:rds:us-east-1:111122223333:db:db-1", "AwsRdsDbInstance");
        record.config.insert("storage_encrypted".to_string(), json!(true));
        assert_eq!(assess_encryption(&record).label, "encrypted");
    }

    #[test]
    fn transit_off_makes_it_unencrypted_despite_at_rest() {
        let mut record = ResourceRecord::new(
            "arn:aws:elasticache:us-east-1:111122223333:cluster:c1",
            "AwsElastiCacheCacheCluster",
        );
        record.config.insert("at_rest_encryption".to_string(), json!(true));
        record.config.insert("transit_encryption".to_string(), json!(false));

        let outcome = assess_encryption(&record);
        assert_eq!(outcome.label, "unencrypted");
        assert_eq!(outcome.details["unencrypted"], json!(["transit_encryption"]));
    }

    #[test]
    fn unencrypted_volume_taints_the_instance() {
        let volume_arn = "arn:aws:ec2:us-east-1:111122223333:volume/vol-1";
        let mut volume = ResourceRecord::new(volume_arn, "AwsEc2Volume");
        volume.config.insert("encrypted".to_string(), json!(false));

        let mut record = ResourceRecord::new("arn:aws:ec2:us-east-1:111122223333:instance/i-1", "AwsEc2Instance");
        record
            .associations
            .entry("volumes".to_string())
            .or_default()
            .insert(volume_arn.to_string(), AssociationSlot::Resolved(Box::new(volume)));

        let outcome = assess_encryption(&record);
        assert_eq!(outcome.label, "unencrypted");
        assert_eq!(outcome.details["unencrypted"], json!([volume_arn]));
    }

    #[test]
    fn no_evidence_at_all_is_unknown() {
        let mut record = ResourceRecord::new("arn:aws:lambda:us-east-1:111122223333:function:f", "AwsLambdaFunction");
        record.config.insert("status".to_string(), json!("active"));
        assert!(assess_encryption(&record).is_unknown());
    }

    #[test]
    fn null_key_is_not_evidence() {
        let mut record = ResourceRecord::new("arn:aws:s3:::bucket-1", "AwsS3Bucket");
        record.config.insert("bucket_encryption".to_string(), json!(null));
        assert!(assess_encryption(&record).is_unknown());
    }
}
