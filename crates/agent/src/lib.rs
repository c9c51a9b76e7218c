//! Triage agents for the incident orchestrator.
//!
//! Two [`TriageOracle`](upkeep_core::triage::TriageOracle) implementations
//! live here:
//! - `RuleBasedTriageOracle` classifies by keyword, looks up a
//!   troubleshooting article and ranks a vendor, fully offline.
//! - `LlmTriageOracle` hands the same tool outputs to a model and reconciles
//!   its JSON answer with the vendor catalog through `guardrails`.
//!
//! The model is only ever a classifier. Vendor identity, pricing and payment
//! stay with the deterministic core.

pub mod classifier;
pub mod guardrails;
pub mod knowledge;
pub mod llm;
pub mod runtime;
pub mod tools;
pub mod triage;

pub use classifier::{IssueClassification, IssueClassifier};
pub use llm::{build_llm_client, LlmClient};
pub use runtime::build_triage_oracle;
pub use triage::{LlmTriageOracle, RuleBasedTriageOracle};
