//! # cumulo — Cloud Finding Context & Impact Engine
//!
//! Enriches cloud security findings with contextual risk data about the
//! affected resource and reduces that context to a single comparable
//! impact score.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      ContextEngine                         │
//! │  ┌──────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐  │
//! │  │ Handler  │ │ Drill-Down│ │  Policy   │ │  Impact    │  │
//! │  │ Registry │ │ Resolver  │ │Classifier │ │ Dimensions │  │
//! │  └────┬─────┘ └────┬──────┘ └────┬──────┘ └─────┬──────┘  │
//! │       │            │             │              │         │
//! │  ┌────▼────────────▼─────────────▼──────────────▼───────┐ │
//! │  │ Finding → ResourceRecord graph → labels → Aggregator │ │
//! │  │           (per-root DrillCache, bounded 2 hops)      │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capabilities
//!
//! - **Association graph resolver**: walks from a resource to its security
//!   groups, IAM roles/policies, subnets and route tables with per-pass
//!   de-duplication and an explicit two-hop depth bound
//! - **Policy risk classifier**: six independent risk predicates over
//!   IAM-style policy documents (wildcard principals, cross-account trust,
//!   dangerous actions, unrestricted statements)
//! - **Security-group rule classifier**: unrestricted ingress/egress
//!   detection over flattened rule records
//! - **Impact dimensions**: exposure, access, encryption, status,
//!   environment, application, owner, findings score
//! - **Impact aggregator**: externally configurable weighted combination
//!   into one 0–100 score
//!
//! The per-resource-type extractors that call cloud provider APIs, the
//! finding source, and all output rendering live outside this crate; they
//! plug in through [`registry::ResourceHandler`] and [`model::Finding`].

pub mod model;
pub mod registry;
pub mod resolver;
pub mod policy;
pub mod impact;
pub mod config;
pub mod engine;

// Re-exports for convenience
pub use model::{Finding, RecordState, ResourceRecord, Severity};
pub use registry::{HandlerRegistry, ResourceHandler};
pub use resolver::{drill_down, DrillCache, DrillPlan};
pub use policy::{PolicyDocument, PolicyStatement, RiskCategory, RiskReport};
pub use impact::{ImpactAssessment, Score};
pub use config::ContextConfig;
pub use engine::{ContextEngine, EnrichedFinding};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CumuloError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource handler error: {0}")]
    HandlerError(String),

    #[error("Policy evaluation error: {0}")]
    PolicyError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type CumuloResult<T> = Result<T, CumuloError>;
