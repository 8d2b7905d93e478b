//! Drill-down resolver — bounded association graph walk
//!
//! Given a root [`ResourceRecord`] whose first-hop associations are
//! declared (ARNs known, slots unresolved), the resolver hydrates each
//! edge by invoking the handler bound to the association kind. A
//! per-root [`DrillCache`] guarantees at most one resolution attempt per
//! ARN per pass, which also makes the walk safe on cyclic graphs
//! (security groups can reference each other).
//!
//! Depth is bounded by a fixed allow-list of second-hop edges rather
//! than a generic transitive closure, to keep API-call volume
//! predictable. The default plan expands exactly two edges one level
//! further: `iam_roles → iam_policies` and `subnets → route_tables`.
//!
//! Each ARN moves through `unresolved → resolving → {resolved | failed}`
//! within a pass; both terminal states are cached and never retried.

use crate::model::{AssociationSlot, ResourceRecord};
use crate::registry::HandlerRegistry;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

// ─── Cache ─────────────────────────────────────────────────────────

/// Terminal resolution state for one ARN.
#[derive(Debug, Clone)]
pub enum DrillOutcome {
    Resolved(ResourceRecord),
    Failed,
}

/// Scoped to one root resource's resolution pass. Never shared across
/// independently evaluated top-level resources: different roots may run
/// under different credentials, and cross-root reuse would go stale.
#[derive(Debug, Default)]
pub struct DrillCache {
    entries: BTreeMap<String, DrillOutcome>,
    handler_calls: usize,
}

impl DrillCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, arn: &str) -> Option<&DrillOutcome> {
        self.entries.get(arn)
    }

    fn store(&mut self, arn: &str, outcome: DrillOutcome) {
        self.entries.insert(arn.to_string(), outcome);
    }

    /// How many handler invocations this pass performed. One per ARN,
    /// never more; tests pin this down.
    pub fn handler_calls(&self) -> usize {
        self.handler_calls
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Plan ──────────────────────────────────────────────────────────

/// The explicit second-hop allow-list. Everything not listed stays a
/// single hop deep.
#[derive(Debug, Clone)]
pub struct DrillPlan {
    second_hops: Vec<(String, String)>,
}

impl Default for DrillPlan {
    fn default() -> Self {
        Self {
            second_hops: vec![
                ("iam_roles".to_string(), "iam_policies".to_string()),
                ("subnets".to_string(), "route_tables".to_string()),
            ],
        }
    }
}

impl DrillPlan {
    /// A plan with no second hops at all.
    pub fn first_hop_only() -> Self {
        Self { second_hops: Vec::new() }
    }

    pub fn with_second_hop(mut self, parent_kind: &str, child_kind: &str) -> Self {
        self.second_hops
            .push((parent_kind.to_string(), child_kind.to_string()));
        self
    }

    fn allows(&self, parent_kind: &str, child_kind: &str) -> bool {
        self.second_hops
            .iter()
            .any(|(p, c)| p == parent_kind && c == child_kind)
    }

    fn has_second_hop(&self, parent_kind: &str) -> bool {
        self.second_hops.iter().any(|(p, _)| p == parent_kind)
    }
}

// ─── Resolution ────────────────────────────────────────────────────

/// Hydrate every declared association edge on `record`.
///
/// Failures stay contained to their edge: a handler error or panic sets
/// that ARN's slot to failed, logs a warning naming the originating
/// resource, and sibling edges continue unaffected.
pub fn drill_down(
    record: &mut ResourceRecord,
    registry: &HandlerRegistry,
    cache: &mut DrillCache,
    plan: &DrillPlan,
) {
    let origin = record.arn.clone();
    for (kind, slots) in record.associations.iter_mut() {
        for (arn, slot) in slots.iter_mut() {
            if slot.is_terminal() {
                continue;
            }
            *slot = resolve_edge(&origin, kind, arn, registry, cache, plan, true);
        }
    }
}

fn resolve_edge(
    origin: &str,
    kind: &str,
    arn: &str,
    registry: &HandlerRegistry,
    cache: &mut DrillCache,
    plan: &DrillPlan,
    second_hop_allowed: bool,
) -> AssociationSlot {
    if let Some(cached) = cache.get(arn) {
        tracing::debug!("{} ignored, already checked", arn);
        return match cached {
            DrillOutcome::Resolved(record) => AssociationSlot::Resolved(Box::new(record.clone())),
            DrillOutcome::Failed => AssociationSlot::Failed,
        };
    }

    let (resource_type, handler) = match registry.lookup_for_kind(kind) {
        Some(found) => found,
        // No handler for this kind: resolution was never attempted, so
        // the slot stays unresolved rather than recording a failure.
        None => return AssociationSlot::Unresolved,
    };

    cache.handler_calls += 1;
    let checks = match catch_unwind(AssertUnwindSafe(|| handler.drilled_checks(arn))) {
        Ok(Ok(Some(checks))) => checks,
        Ok(Ok(None)) => {
            tracing::info!("{} referenced by {} no longer exists", arn, origin);
            cache.store(arn, DrillOutcome::Failed);
            return AssociationSlot::Failed;
        }
        Ok(Err(e)) => {
            tracing::warn!("Drilling {} from {} failed: {}", arn, origin, e);
            cache.store(arn, DrillOutcome::Failed);
            return AssociationSlot::Failed;
        }
        Err(_) => {
            tracing::warn!("Handler for {} panicked while drilling {}", kind, arn);
            cache.store(arn, DrillOutcome::Failed);
            return AssociationSlot::Failed;
        }
    };

    let mut child = ResourceRecord::new(arn, resource_type);
    child.config = checks;

    if second_hop_allowed && plan.has_second_hop(kind) {
        expand_second_hop(origin, kind, &mut child, registry, cache, plan);
    }

    cache.store(arn, DrillOutcome::Resolved(child.clone()));
    AssociationSlot::Resolved(Box::new(child))
}

/// Ask the drilled resource for its own associations and resolve the
/// kinds the plan allows, one level and no further.
fn expand_second_hop(
    origin: &str,
    parent_kind: &str,
    child: &mut ResourceRecord,
    registry: &HandlerRegistry,
    cache: &mut DrillCache,
    plan: &DrillPlan,
) {
    let handler = match registry.lookup_for_kind(parent_kind) {
        Some((_, h)) => h,
        None => return,
    };

    let child_arn = child.arn.clone();
    let associations = match catch_unwind(AssertUnwindSafe(|| handler.associations(&child_arn))) {
        Ok(Ok(Some(map))) => map,
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            tracing::warn!("Listing associations of {} failed: {}", child_arn, e);
            return;
        }
        Err(_) => {
            tracing::warn!("Handler panicked listing associations of {}", child_arn);
            return;
        }
    };

    for (grandchild_kind, arns) in associations {
        if !plan.allows(parent_kind, &grandchild_kind) {
            continue;
        }
        for arn in arns {
            let slot = resolve_edge(origin, &grandchild_kind, &arn, registry, cache, plan, false);
            child
                .associations
                .entry(grandchild_kind.clone())
                .or_default()
                .insert(arn, slot);
        }
    }
}

/// Convenience for callers that only have the first-hop declaration as
/// a kind → ARNs map.
pub fn declare_associations(record: &mut ResourceRecord, edges: BTreeMap<String, Vec<String>>) {
    for (kind, arns) in edges {
        for arn in arns {
            record.declare_association(kind.clone(), arn);
        }
    }
}
