pub mod approvals;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod orchestrator;
pub mod ranking;
pub mod settlement;
pub mod trace;
pub mod triage;
pub mod vendor_service;

pub use approvals::{
    evaluate_quote_budget, ApprovalThresholds, AutoApprovalPolicy, BudgetDecision,
    FixedAutoApproval, RandomAutoApproval,
};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink, TracingAuditSink};
pub use catalog::{CatalogError, VendorCatalog};
pub use domain::booking::{Booking, JobStatus, JobUpdate};
pub use domain::incident::{IncidentId, IncidentRecord, IssueType, Severity};
pub use domain::quote::{AvailabilitySlot, CostEstimate, Quote, QuoteId};
pub use domain::vendor::{SelectedVendor, ServiceType, VendorId, VendorRecord, VendorSelection};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowEngine, IncidentEvent, IncidentFlow, IncidentState};
pub use orchestrator::{IncidentOrchestrator, OrchestratorSettings};
pub use ranking::{UtilityWeights, VendorRanker};
pub use settlement::{settle_payment, SettlementOutcome, SettlementPolicy};
pub use trace::IncidentTrace;
pub use triage::{TriageLabel, TriageOracle, TriageRequest, TriageVerdict};
pub use vendor_service::{VendorServiceClient, VendorServiceError};
