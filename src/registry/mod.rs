//! Handler registry — resource-type string → extractor dispatch
//!
//! The per-resource-type extractors live outside this crate; they plug in
//! through the [`ResourceHandler`] trait and are registered here under
//! their resource-type discriminant (e.g. `AwsEc2Instance`). An unknown
//! type is not an error: lookup yields no handler and the caller treats
//! the resource as contributing no config or associations.

use crate::model::Value;
use crate::CumuloResult;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ─── Handler trait ─────────────────────────────────────────────────

/// The capability set every per-resource-type extractor exposes.
///
/// All three methods return `Ok(None)` when the underlying resource no
/// longer exists (deleted between finding and evaluation). That is a
/// different outcome from a handler error, and both are different from
/// "no handler registered"; the resolver degrades gracefully on each.
pub trait ResourceHandler: Send + Sync {
    /// Check results for the resource itself.
    fn config(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Value>>>;

    /// First-hop association edges: kind → related ARNs, unresolved.
    fn associations(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Vec<String>>>>;

    /// The flat check map emitted when this resource is reached by
    /// drilling from another resource. Drilled handlers emit only their
    /// own checks, never a further graph.
    fn drilled_checks(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Value>>>;
}

// ─── Registry ──────────────────────────────────────────────────────

/// Maps resource-type strings to handlers, and association kinds to the
/// resource type that resolves them. Everything under `security_groups`
/// always resolves via the security-group handler regardless of how the
/// edge was discovered.
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Box<dyn ResourceHandler>>,
    kind_bindings: BTreeMap<String, String>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            kind_bindings: default_kind_bindings(),
        }
    }

    pub fn register(&mut self, resource_type: impl Into<String>, handler: Box<dyn ResourceHandler>) {
        self.handlers.insert(resource_type.into(), handler);
    }

    /// Bind an association kind to the resource type that resolves it,
    /// replacing any default binding.
    pub fn bind_kind(&mut self, kind: impl Into<String>, resource_type: impl Into<String>) {
        self.kind_bindings.insert(kind.into(), resource_type.into());
    }

    /// Handler for a resource-type discriminant. `None` is a supported
    /// outcome, not a failure.
    pub fn lookup(&self, resource_type: &str) -> Option<&dyn ResourceHandler> {
        let handler = self.handlers.get(resource_type).map(|h| h.as_ref());
        if handler.is_none() {
            tracing::info!("No handler registered for resource type {}", resource_type);
        }
        handler
    }

    /// Handler for an association kind, via the kind binding table.
    pub fn lookup_for_kind(&self, kind: &str) -> Option<(&str, &dyn ResourceHandler)> {
        let resource_type = match self.kind_bindings.get(kind) {
            Some(t) => t.as_str(),
            None => {
                tracing::info!("No resource type bound to association kind {}", kind);
                return None;
            }
        };
        self.lookup(resource_type).map(|h| (resource_type, h))
    }
}

fn default_kind_bindings() -> BTreeMap<String, String> {
    [
        ("security_groups", "AwsEc2SecurityGroup"),
        ("iam_roles", "AwsIamRole"),
        ("iam_policies", "AwsIamPolicy"),
        ("subnets", "AwsEc2Subnet"),
        ("route_tables", "AwsEc2RouteTable"),
        ("network_interfaces", "AwsEc2NetworkInterface"),
        ("volumes", "AwsEc2Volume"),
        ("snapshots", "AwsEc2Snapshot"),
        ("autoscaling_groups", "AwsAutoScalingAutoScalingGroup"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// ─── In-memory handler ─────────────────────────────────────────────

/// A handler backed by fixed in-memory data, keyed by ARN.
///
/// This is the shape a real extractor mimics; the crate's own tests use
/// it to stand in for the API-calling layer. The call counter makes the
/// resolver's one-call-per-ARN guarantee observable.
#[derive(Default)]
pub struct StaticHandler {
    configs: BTreeMap<String, BTreeMap<String, Value>>,
    associations: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    drilled: BTreeMap<String, BTreeMap<String, Value>>,
    failing_arns: Vec<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, arn: &str, config: BTreeMap<String, Value>) -> Self {
        self.configs.insert(arn.to_string(), config);
        self
    }

    pub fn with_associations(mut self, arn: &str, kinds: BTreeMap<String, Vec<String>>) -> Self {
        self.associations.insert(arn.to_string(), kinds);
        self
    }

    pub fn with_drilled(mut self, arn: &str, checks: BTreeMap<String, Value>) -> Self {
        self.drilled.insert(arn.to_string(), checks);
        self
    }

    /// Make every call for this ARN return a handler error.
    pub fn failing(mut self, arn: &str) -> Self {
        self.failing_arns.push(arn.to_string());
        self
    }

    /// Shared counter of drilled-check invocations.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn check_failure(&self, arn: &str) -> CumuloResult<()> {
        if self.failing_arns.iter().any(|a| a == arn) {
            return Err(crate::CumuloError::HandlerError(format!(
                "simulated API failure for {}",
                arn
            )));
        }
        Ok(())
    }
}

impl ResourceHandler for StaticHandler {
    fn config(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Value>>> {
        self.check_failure(arn)?;
        Ok(self.configs.get(arn).cloned())
    }

    fn associations(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Vec<String>>>> {
        self.check_failure(arn)?;
        Ok(self.associations.get(arn).cloned())
    }

    fn drilled_checks(&self, arn: &str) -> CumuloResult<Option<BTreeMap<String, Value>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(arn)?;
        Ok(self.drilled.get(arn).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_yields_no_handler() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup("AwsMadeUpService").is_none());
    }

    #[test]
    fn kind_binding_routes_to_registered_handler() {
        let mut registry = HandlerRegistry::new();
        let handler = StaticHandler::new().with_drilled(
            "arn:aws:ec2:us-east-1:111122223333:security-group/sg-1",
            [("unrestricted_ingress_rules".to_string(), json!(true))].into(),
        );
        registry.register("AwsEc2SecurityGroup", Box::new(handler));

        let (resource_type, handler) = registry.lookup_for_kind("security_groups").unwrap();
        assert_eq!(resource_type, "AwsEc2SecurityGroup");
        let checks = handler
            .drilled_checks("arn:aws:ec2:us-east-1:111122223333:security-group/sg-1")
            .unwrap()
            .unwrap();
        assert_eq!(checks["unrestricted_ingress_rules"], json!(true));
    }

    #[test]
    fn not_found_is_distinct_from_error() {
        let handler = StaticHandler::new().failing("arn:aws:iam::111122223333:role/broken");
        assert!(handler.config("arn:aws:iam::111122223333:role/gone").unwrap().is_none());
        assert!(handler.config("arn:aws:iam::111122223333:role/broken").is_err());
    }
}
