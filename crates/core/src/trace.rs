use serde::{Deserialize, Serialize};

use crate::approvals::BudgetDecision;
use crate::domain::booking::{Booking, JobUpdate};
use crate::domain::incident::{IncidentId, IssueType, Severity};
use crate::domain::quote::{AvailabilitySlot, Quote};
use crate::domain::vendor::VendorSelection;
use crate::flows::IncidentState;
use crate::settlement::SettlementOutcome;
use crate::triage::{KnowledgeArticleRef, TriageLabel};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub label: TriageLabel,
    pub explanation: String,
    pub issue_type: Option<IssueType>,
    pub severity: Option<Severity>,
    pub propose_self_help: bool,
    pub must_escalate_immediately: bool,
    pub kb_article: Option<KnowledgeArticleRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfHelpPlan {
    pub issue_type: Option<IssueType>,
    pub steps: Vec<String>,
    pub kb_article: Option<KnowledgeArticleRef>,
    pub explanation: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    pub tenant: Vec<String>,
    pub landlord: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Ok,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorCallLog {
    pub operation: String,
    pub outcome: CallOutcome,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub step: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Everything one orchestration run observed, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncidentTrace {
    pub incident_id: IncidentId,
    pub trace_id: String,
    pub states: Vec<IncidentState>,
    pub triage: Option<TriageSummary>,
    pub self_help: Option<SelfHelpPlan>,
    pub vendor_selection: Option<VendorSelection>,
    pub quote: Option<Quote>,
    pub approval: Option<BudgetDecision>,
    pub chosen_slot: Option<AvailabilitySlot>,
    pub booking: Option<Booking>,
    pub job_update: Option<JobUpdate>,
    pub payment: Option<SettlementOutcome>,
    pub messages: Messages,
    pub vendor_logs: Vec<VendorCallLog>,
    pub diagnostics: Vec<Diagnostic>,
}

impl IncidentTrace {
    pub fn final_state(&self) -> Option<IncidentState> {
        self.states.last().copied()
    }

    pub fn state_names(&self) -> Vec<&'static str> {
        self.states.iter().map(IncidentState::as_str).collect()
    }

    pub fn paid(&self) -> bool {
        self.payment.as_ref().is_some_and(|outcome| outcome.paid)
    }
}

/// Run-owned accumulator. Only the orchestrator writes to it.
#[derive(Debug)]
pub struct TraceRecorder {
    trace: IncidentTrace,
}

impl TraceRecorder {
    pub fn new(incident_id: IncidentId, trace_id: impl Into<String>) -> Self {
        Self {
            trace: IncidentTrace {
                incident_id,
                trace_id: trace_id.into(),
                states: Vec::new(),
                triage: None,
                self_help: None,
                vendor_selection: None,
                quote: None,
                approval: None,
                chosen_slot: None,
                booking: None,
                job_update: None,
                payment: None,
                messages: Messages::default(),
                vendor_logs: Vec::new(),
                diagnostics: Vec::new(),
            },
        }
    }

    pub fn current_state(&self) -> Option<IncidentState> {
        self.trace.final_state()
    }

    pub fn push_state(&mut self, state: IncidentState) {
        self.trace.states.push(state);
    }

    pub fn tenant(&mut self, message: impl Into<String>) {
        self.trace.messages.tenant.push(message.into());
    }

    pub fn landlord(&mut self, message: impl Into<String>) {
        self.trace.messages.landlord.push(message.into());
    }

    pub fn vendor_call(
        &mut self,
        operation: impl Into<String>,
        outcome: CallOutcome,
        detail: impl Into<String>,
    ) {
        self.trace.vendor_logs.push(VendorCallLog {
            operation: operation.into(),
            outcome,
            detail: detail.into(),
        });
    }

    pub fn diagnostic(
        &mut self,
        step: impl Into<String>,
        message: impl Into<String>,
        raw: Option<String>,
    ) {
        self.trace.diagnostics.push(Diagnostic { step: step.into(), message: message.into(), raw });
    }

    pub fn set_triage(&mut self, summary: TriageSummary) {
        self.trace.triage = Some(summary);
    }

    pub fn set_self_help(&mut self, plan: SelfHelpPlan) {
        self.trace.self_help = Some(plan);
    }

    pub fn set_vendor_selection(&mut self, selection: Option<VendorSelection>) {
        self.trace.vendor_selection = selection;
    }

    pub fn set_quote(&mut self, quote: Quote) {
        self.trace.quote = Some(quote);
    }

    pub fn set_approval(&mut self, decision: BudgetDecision) {
        self.trace.approval = Some(decision);
    }

    pub fn set_chosen_slot(&mut self, slot: AvailabilitySlot) {
        self.trace.chosen_slot = Some(slot);
    }

    pub fn set_booking(&mut self, booking: Booking) {
        self.trace.booking = Some(booking);
    }

    pub fn set_job_update(&mut self, update: JobUpdate) {
        self.trace.job_update = Some(update);
    }

    pub fn set_payment(&mut self, outcome: SettlementOutcome) {
        self.trace.payment = Some(outcome);
    }

    pub fn finish(self) -> IncidentTrace {
        self.trace
    }
}
