//! Context engine — the per-finding orchestrator
//!
//! For each finding: resolve the type-specific handler, build the root
//! record's config and first-hop association declarations, drill the
//! association graph with a fresh per-root cache, run the impact
//! dimensions and aggregate the score. Every failure along the way
//! degrades to less context; nothing here aborts a scan of many
//! findings.

use crate::config::ContextConfig;
use crate::impact::{
    aggregate, assess_access, assess_application, assess_encryption, assess_environment,
    assess_exposure, assess_owner, assess_status, score_findings, ImpactAssessment, MetaScore,
    Score,
};
use crate::model::{Finding, ResourceRecord};
use crate::registry::HandlerRegistry;
use crate::resolver::{declare_associations, drill_down, DrillCache, DrillPlan};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A finding with its resolved context graph and impact assessment.
/// Serialization to JSON/CSV/whatever is the caller's business.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedFinding {
    pub finding: Finding,
    pub record: ResourceRecord,
    pub impact: ImpactAssessment,
}

pub struct ContextEngine {
    registry: HandlerRegistry,
    config: ContextConfig,
    plan: DrillPlan,
}

impl ContextEngine {
    pub fn new(registry: HandlerRegistry, config: ContextConfig) -> Self {
        if let Err(e) = config.impact.validate() {
            tracing::warn!("Impact weights table is invalid, scoring will be disabled: {}", e);
        }
        Self {
            registry,
            config,
            plan: DrillPlan::default(),
        }
    }

    /// Override the second-hop allow-list.
    pub fn with_plan(mut self, plan: DrillPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Enrich one finding. `history` is the resource's full finding set
    /// (the findings score runs over it); pass an empty slice to score
    /// just this finding.
    pub fn enrich(&self, finding: &Finding, history: &[Finding]) -> EnrichedFinding {
        let mut record = self.build_root_record(finding);

        // The cache lives and dies with this root: different roots may
        // run under different credentials.
        let mut cache = DrillCache::new();
        drill_down(&mut record, &self.registry, &mut cache, &self.plan);
        tracing::debug!(
            "Resolved {} with {} handler call(s), {} cached ARN(s)",
            finding.resource_arn,
            cache.handler_calls(),
            cache.len()
        );

        let findings = if history.is_empty() {
            score_findings(std::slice::from_ref(finding))
        } else {
            score_findings(history)
        };

        let exposure = assess_exposure(&record);
        let access = assess_access(
            &record,
            &finding.aws_account_id,
            &self.config.trusted_accounts,
            &self.config.dangerous_actions,
        );
        let encryption = assess_encryption(&record);
        let status = assess_status(&record);
        let environment =
            assess_environment(&self.config.environments, &finding.tags, &finding.aws_account_id);
        let application =
            assess_application(&self.config.applications, &finding.tags, &finding.aws_account_id);
        let owner = assess_owner(&self.config.owners, &finding.tags, &finding.aws_account_id);

        let mut impact = ImpactAssessment {
            exposure,
            access,
            encryption,
            status,
            environment,
            application,
            owner,
            findings,
            meta_score: MetaScore::NotApplicable,
            score: Score::Disabled,
        };
        let (meta_score, score) =
            aggregate(&impact.labels(), impact.findings.score, &self.config.impact);
        impact.meta_score = meta_score;
        impact.score = score;

        EnrichedFinding {
            finding: finding.clone(),
            record,
            impact,
        }
    }

    /// Whether a record passes the configured check filters. An empty
    /// filter set passes everything; otherwise filters combine under
    /// the configured mode (all must match, or any may).
    pub fn matches_filters(&self, record: &ResourceRecord) -> bool {
        if self.config.check_filters.is_empty() {
            return true;
        }
        self.config.filter_mode.combine(
            self.config
                .check_filters
                .iter()
                .map(|(key, expected)| record.config.get(key) == Some(expected)),
        )
    }

    /// Root record construction: handler config plus declared (still
    /// unresolved) first-hop associations. Unknown type, deleted
    /// resource and handler failure all degrade to an emptier record.
    fn build_root_record(&self, finding: &Finding) -> ResourceRecord {
        let mut record = ResourceRecord::new(&finding.resource_arn, &finding.resource_type);

        let handler = match self.registry.lookup(&finding.resource_type) {
            Some(h) => h,
            None => return record,
        };

        let arn = finding.resource_arn.clone();
        match catch_unwind(AssertUnwindSafe(|| handler.config(&arn))) {
            Ok(Ok(Some(config))) => record.config = config,
            Ok(Ok(None)) => {
                tracing::info!("{} no longer exists, continuing without config", arn);
            }
            Ok(Err(e)) => tracing::warn!("Extracting config for {} failed: {}", arn, e),
            Err(_) => tracing::warn!("Handler panicked extracting config for {}", arn),
        }

        match catch_unwind(AssertUnwindSafe(|| handler.associations(&arn))) {
            Ok(Ok(Some(edges))) => declare_associations(&mut record, edges),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => tracing::warn!("Listing associations for {} failed: {}", arn, e),
            Err(_) => tracing::warn!("Handler panicked listing associations for {}", arn),
        }

        record
    }
}
