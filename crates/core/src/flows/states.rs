use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentState {
    Reported,
    Triaged,
    SelfHelpProposed,
    SelfHelpSucceeded,
    SelfHelpFailed,
    Escalated,
    VendorSelected,
    QuoteReceived,
    QuoteApproved,
    QuoteRejected,
    Scheduled,
    WorkDone,
    Failed,
    Paid,
    Closed,
}

impl IncidentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reported => "REPORTED",
            Self::Triaged => "TRIAGED",
            Self::SelfHelpProposed => "SELF_HELP_PROPOSED",
            Self::SelfHelpSucceeded => "SELF_HELP_SUCCEEDED",
            Self::SelfHelpFailed => "SELF_HELP_FAILED",
            Self::Escalated => "ESCALATED",
            Self::VendorSelected => "VENDOR_SELECTED",
            Self::QuoteReceived => "QUOTE_RECEIVED",
            Self::QuoteApproved => "QUOTE_APPROVED",
            Self::QuoteRejected => "QUOTE_REJECTED",
            Self::Scheduled => "SCHEDULED",
            Self::WorkDone => "WORK_DONE",
            Self::Failed => "FAILED",
            Self::Paid => "PAID",
            Self::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentEvent {
    TriageCompleted,
    SelfHelpRecommended,
    EscalationRequired,
    SelfHelpResolved,
    SelfHelpUnresolved,
    VendorChosen,
    QuoteReceived,
    QuoteWithinPolicy,
    QuoteOutsidePolicy,
    SlotBooked,
    WorkCompleted,
    WorkFailed,
    PaymentSettled,
    CloseRequested,
}

/// Facts the transition table checks before allowing an edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub vendor_resolved: bool,
    pub payment_settled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: IncidentState,
    pub to: IncidentState,
    pub event: IncidentEvent,
}
