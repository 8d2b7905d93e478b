//! Exposure dimension — how reachable is this resource from outside
//!
//! Combines the resource's own public flag with the ingress posture of
//! its resolved security groups:
//!
//! - `effectively-public`: public flag set and an unrestricted ingress
//!   path exists, or public with no security group in front at all
//! - `restricted-public`: public flag set but every ingress is
//!   restricted
//! - `unrestricted-private`: not flagged public, but an unrestricted
//!   ingress path exists
//! - `restricted`: neither
//! - `unknown`: the resolver produced nothing for this record

use super::DimensionOutcome;
use crate::model::{is_affirmative, tri_state, ResourceRecord};
use serde_json::json;

/// Config keys that mark a resource as publicly addressable.
const PUBLIC_KEYS: &[&str] = &["public", "public_ip", "public_endpoint", "public_access"];

/// Drilled security-group check that reports open ingress.
const UNRESTRICTED_INGRESS_KEY: &str = "unrestricted_ingress_rules";

pub fn assess_exposure(record: &ResourceRecord) -> DimensionOutcome {
    if record.is_unresolved() {
        return DimensionOutcome::unknown();
    }

    let public_key = PUBLIC_KEYS
        .iter()
        .find(|key| tri_state(&record.config, key) == Some(true));
    let is_public = public_key.is_some();

    let open_ingress = unrestricted_ingress_source(record);
    let has_security_groups = record
        .associations
        .get("security_groups")
        .map(|slots| !slots.is_empty())
        .unwrap_or(false);

    let mut outcome = match (is_public, &open_ingress, has_security_groups) {
        (true, Some(_), _) | (true, None, false) => DimensionOutcome::label("effectively-public"),
        (true, None, true) => DimensionOutcome::label("restricted-public"),
        (false, Some(_), _) => DimensionOutcome::label("unrestricted-private"),
        (false, None, _) => DimensionOutcome::label("restricted"),
    };

    if let Some(key) = public_key {
        outcome = outcome.with_detail(*key, json!(true));
    }
    if let Some(source) = open_ingress {
        outcome = outcome.with_detail("unrestricted_ingress", json!(source));
    }
    outcome
}

/// Where an unrestricted ingress path comes from: the record's own
/// rules (when the resource is itself a security group) or one of its
/// resolved security-group associations.
fn unrestricted_ingress_source(record: &ResourceRecord) -> Option<String> {
    if record
        .config
        .get(UNRESTRICTED_INGRESS_KEY)
        .map(is_affirmative)
        .unwrap_or(false)
    {
        return Some(record.arn.clone());
    }
    record
        .resolved("security_groups")
        .find(|sg| {
            sg.config
                .get(UNRESTRICTED_INGRESS_KEY)
                .map(is_affirmative)
                .unwrap_or(false)
        })
        .map(|sg| sg.arn.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssociationSlot;
    use serde_json::json;

    const SG: &str = "arn:aws:ec2:us-east-1:111122223333:security-group/sg-1";

    fn record_with_sg(public: bool, open_ingress: bool) -> ResourceRecord {
        let mut record = ResourceRecord::new(
            "arn:aws:ec2:us-east-1:111122223333:instance/i-1",
            "AwsEc2Instance",
        );
        record.config.insert("public".to_string(), json!(public));

        let mut sg = ResourceRecord::new(SG, "AwsEc2SecurityGroup");
        sg.config
            .insert(UNRESTRICTED_INGRESS_KEY.to_string(), json!(open_ingress));
        record
            .associations
            .entry("security_groups".to_string())
            .or_default()
            .insert(SG.to_string(), AssociationSlot::Resolved(Box::new(sg)));
        record
    }

    #[test]
    fn public_with_open_ingress_is_effectively_public() {
        let outcome = assess_exposure(&record_with_sg(true, true));
        assert_eq!(outcome.label, "effectively-public");
        assert_eq!(outcome.details["unrestricted_ingress"], json!(SG));
    }

    #[test]
    fn public_without_any_security_group_is_effectively_public() {
        let mut record = ResourceRecord::new(
            "arn:aws:s3:::bucket-1",
            "AwsS3Bucket",
        );
        record.config.insert("public".to_string(), json!(true));
        assert_eq!(assess_exposure(&record).label, "effectively-public");
    }

    #[test]
    fn public_behind_restricted_groups_is_restricted_public() {
        assert_eq!(assess_exposure(&record_with_sg(true, false)).label, "restricted-public");
    }

    #[test]
    fn private_with_open_ingress_is_unrestricted_private() {
        assert_eq!(assess_exposure(&record_with_sg(false, true)).label, "unrestricted-private");
    }

    #[test]
    fn private_and_closed_is_restricted() {
        assert_eq!(assess_exposure(&record_with_sg(false, false)).label, "restricted");
    }

    #[test]
    fn unresolved_record_is_unknown() {
        let record = ResourceRecord::new("arn:aws:ec2:us-east-1:111122223333:instance/i-9", "AwsEc2Instance");
        assert!(assess_exposure(&record).is_unknown());
    }

    #[test]
    fn explicit_false_public_flag_is_not_public() {
        // public=false is an explicit negative, not missing evidence
        let outcome = assess_exposure(&record_with_sg(false, false));
        assert_eq!(outcome.label, "restricted");
    }
}
