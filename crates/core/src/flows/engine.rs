use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::flows::states::{FlowContext, IncidentEvent, IncidentState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> IncidentState;
    fn transition(
        &self,
        current: &IncidentState,
        event: &IncidentEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The fixed maintenance-incident graph.
#[derive(Clone, Debug, Default)]
pub struct IncidentFlow;

impl FlowDefinition for IncidentFlow {
    fn initial_state(&self) -> IncidentState {
        IncidentState::Reported
    }

    fn transition(
        &self,
        current: &IncidentState,
        event: &IncidentEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_incident(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> IncidentState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &IncidentState,
        event: &IncidentEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &IncidentState,
        event: &IncidentEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    audit
                        .event(
                            "incident.transition_applied",
                            AuditCategory::Flow,
                            AuditOutcome::Success,
                        )
                        .with_metadata("from", outcome.from.as_str())
                        .with_metadata("to", outcome.to.as_str())
                        .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "incident.transition_rejected",
                            AuditCategory::Flow,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("from", current.as_str())
                        .with_metadata("event", format!("{event:?}"))
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<IncidentFlow> {
    fn default() -> Self {
        Self::new(IncidentFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("cannot enter {to} from {state}: no vendor has been resolved")]
    VendorNotResolved { state: IncidentState, to: IncidentState },
    #[error("cannot enter PAID from {state}: payment was not settled")]
    PaymentNotSettled { state: IncidentState },
    #[error("incident is already closed")]
    AlreadyClosed,
    #[error("invalid transition from {state} using event {event:?}")]
    InvalidTransition { state: IncidentState, event: IncidentEvent },
}

fn transition_incident(
    current: &IncidentState,
    event: &IncidentEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use IncidentEvent::{
        CloseRequested, EscalationRequired, PaymentSettled, QuoteOutsidePolicy, QuoteReceived,
        QuoteWithinPolicy, SelfHelpRecommended, SelfHelpResolved, SelfHelpUnresolved, SlotBooked,
        TriageCompleted, VendorChosen, WorkCompleted, WorkFailed,
    };
    use IncidentState::{
        Closed, Escalated, Failed, Paid, QuoteApproved, QuoteRejected, Reported, Scheduled,
        SelfHelpFailed, SelfHelpProposed, SelfHelpSucceeded, Triaged, VendorSelected, WorkDone,
    };

    let to = match (current, event) {
        (Closed, _) => return Err(FlowTransitionError::AlreadyClosed),
        (Reported, TriageCompleted) => Triaged,
        (Triaged, SelfHelpRecommended) => SelfHelpProposed,
        (Triaged, EscalationRequired) | (SelfHelpFailed, EscalationRequired) => Escalated,
        (SelfHelpProposed, SelfHelpResolved) => SelfHelpSucceeded,
        (SelfHelpProposed, SelfHelpUnresolved) => SelfHelpFailed,
        (Escalated, VendorChosen) => {
            if !context.vendor_resolved {
                return Err(FlowTransitionError::VendorNotResolved {
                    state: *current,
                    to: VendorSelected,
                });
            }
            VendorSelected
        }
        (VendorSelected, QuoteReceived) => IncidentState::QuoteReceived,
        (IncidentState::QuoteReceived, QuoteWithinPolicy) => QuoteApproved,
        (IncidentState::QuoteReceived, QuoteOutsidePolicy) => QuoteRejected,
        (QuoteApproved, SlotBooked) => Scheduled,
        (Scheduled, WorkCompleted) => WorkDone,
        (Scheduled, WorkFailed) => Failed,
        (WorkDone, PaymentSettled) => {
            if !context.payment_settled {
                return Err(FlowTransitionError::PaymentNotSettled { state: *current });
            }
            Paid
        }
        (_, CloseRequested) => Closed,
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::flows::engine::{FlowEngine, FlowTransitionError, IncidentFlow};
    use crate::flows::states::{FlowContext, IncidentEvent, IncidentState};

    fn walk(events: &[IncidentEvent], context: &FlowContext) -> Vec<IncidentState> {
        let engine = FlowEngine::default();
        let mut state = engine.initial_state();
        let mut states = vec![state];
        for event in events {
            state = engine.apply(&state, event, context).expect("valid transition").to;
            states.push(state);
        }
        states
    }

    #[test]
    fn self_help_success_path() {
        let states = walk(
            &[
                IncidentEvent::TriageCompleted,
                IncidentEvent::SelfHelpRecommended,
                IncidentEvent::SelfHelpResolved,
                IncidentEvent::CloseRequested,
            ],
            &FlowContext::default(),
        );
        assert_eq!(
            states,
            vec![
                IncidentState::Reported,
                IncidentState::Triaged,
                IncidentState::SelfHelpProposed,
                IncidentState::SelfHelpSucceeded,
                IncidentState::Closed,
            ]
        );
    }

    #[test]
    fn full_vendor_path_through_payment() {
        let context = FlowContext { vendor_resolved: true, payment_settled: true };
        let states = walk(
            &[
                IncidentEvent::TriageCompleted,
                IncidentEvent::SelfHelpRecommended,
                IncidentEvent::SelfHelpUnresolved,
                IncidentEvent::EscalationRequired,
                IncidentEvent::VendorChosen,
                IncidentEvent::QuoteReceived,
                IncidentEvent::QuoteWithinPolicy,
                IncidentEvent::SlotBooked,
                IncidentEvent::WorkCompleted,
                IncidentEvent::PaymentSettled,
                IncidentEvent::CloseRequested,
            ],
            &context,
        );
        assert_eq!(states.last(), Some(&IncidentState::Closed));
        assert!(states.contains(&IncidentState::Paid));
        assert_eq!(states.iter().filter(|state| state.is_terminal()).count(), 1);
    }

    #[test]
    fn vendor_selection_requires_a_resolved_vendor() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&IncidentState::Escalated, &IncidentEvent::VendorChosen, &FlowContext::default())
            .expect_err("no vendor resolved");
        assert!(matches!(error, FlowTransitionError::VendorNotResolved { .. }));
    }

    #[test]
    fn paid_requires_settlement() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &IncidentState::WorkDone,
                &IncidentEvent::PaymentSettled,
                &FlowContext { vendor_resolved: true, payment_settled: false },
            )
            .expect_err("unsettled payment");
        assert_eq!(error, FlowTransitionError::PaymentNotSettled { state: IncidentState::WorkDone });
    }

    #[test]
    fn closed_is_absorbing() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&IncidentState::Closed, &IncidentEvent::CloseRequested, &FlowContext::default())
            .expect_err("closed twice");
        assert_eq!(error, FlowTransitionError::AlreadyClosed);
    }

    #[test]
    fn skipping_triage_is_rejected() {
        let engine = FlowEngine::new(IncidentFlow);
        let error = engine
            .apply(&IncidentState::Reported, &IncidentEvent::QuoteReceived, &FlowContext::default())
            .expect_err("cannot quote before triage");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: IncidentState::Reported,
                event: IncidentEvent::QuoteReceived
            }
        ));
    }

    #[test]
    fn rejected_quote_can_only_close() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&IncidentState::QuoteRejected, &IncidentEvent::SlotBooked, &FlowContext::default())
            .expect_err("rejected quote cannot be booked");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));

        let outcome = engine
            .apply(&IncidentState::QuoteRejected, &IncidentEvent::CloseRequested, &FlowContext::default())
            .expect("rejected quote closes");
        assert_eq!(outcome.to, IncidentState::Closed);
        assert_eq!(outcome.from, IncidentState::QuoteRejected);
    }

    #[test]
    fn audited_apply_records_applied_and_rejected_events() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "run-1", "orchestrator");

        engine
            .apply_with_audit(
                &IncidentState::Reported,
                &IncidentEvent::TriageCompleted,
                &FlowContext::default(),
                &sink,
                &audit,
            )
            .expect("reported -> triaged");
        let _ = engine.apply_with_audit(
            &IncidentState::Triaged,
            &IncidentEvent::WorkCompleted,
            &FlowContext::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "incident.transition_applied");
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("TRIAGED"));
        assert_eq!(events[1].event_type, "incident.transition_rejected");
        assert!(events[1].metadata.contains_key("error"));
    }
}
