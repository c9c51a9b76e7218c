//! End-to-end incident orchestration.
//!
//! One `run` drives one incident through the flow engine, calling the triage
//! oracle, the ranker, the vendor service and settlement strictly in
//! sequence. Every path ends with exactly one `CLOSED` state; collaborator
//! failures and engine rejections close the incident early instead of
//! surfacing as errors.

use std::sync::Arc;

use uuid::Uuid;

use crate::approvals::{evaluate_quote_budget, AutoApprovalPolicy, RandomAutoApproval};
use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink, NoopAuditSink};
use crate::catalog::VendorCatalog;
use crate::domain::booking::{Booking, JobUpdate};
use crate::domain::incident::{IncidentRecord, IssueType, Severity};
use crate::domain::quote::Quote;
use crate::domain::vendor::{SelectedVendor, VendorSelection};
use crate::flows::{
    FlowContext, FlowEngine, FlowTransitionError, IncidentEvent, IncidentFlow, IncidentState,
};
use crate::ranking::VendorRanker;
use crate::settlement::{settle_payment, SettlementPolicy};
use crate::trace::{CallOutcome, IncidentTrace, SelfHelpPlan, TraceRecorder, TriageSummary};
use crate::triage::{TriageLabel, TriageOracle, TriageRequest, TriageVerdict};
use crate::vendor_service::{
    AvailabilityRequest, BookingRequest, JobStatusRequest, QuoteRequest, VendorServiceClient,
    VendorServiceError,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub settlement: SettlementPolicy,
    /// Appends `PAID` before `CLOSED` when settlement succeeds.
    pub record_paid_state: bool,
    pub tenant_name: String,
    pub tenant_phone: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            settlement: SettlementPolicy::default(),
            record_paid_state: false,
            tenant_name: "Test Tenant".to_owned(),
            tenant_phone: "000-000-0000".to_owned(),
        }
    }
}

pub struct IncidentOrchestrator {
    triage: Arc<dyn TriageOracle>,
    vendor_service: Arc<dyn VendorServiceClient>,
    ranker: VendorRanker,
    approval: Arc<dyn AutoApprovalPolicy>,
    audit_sink: Arc<dyn AuditSink>,
    settings: OrchestratorSettings,
    engine: FlowEngine<IncidentFlow>,
}

impl IncidentOrchestrator {
    pub fn new(
        triage: Arc<dyn TriageOracle>,
        vendor_service: Arc<dyn VendorServiceClient>,
        catalog: Arc<VendorCatalog>,
    ) -> Self {
        Self {
            triage,
            vendor_service,
            ranker: VendorRanker::new(catalog),
            approval: Arc::new(RandomAutoApproval::default()),
            audit_sink: Arc::new(NoopAuditSink),
            settings: OrchestratorSettings::default(),
            engine: FlowEngine::default(),
        }
    }

    pub fn with_approval_policy(mut self, policy: Arc<dyn AutoApprovalPolicy>) -> Self {
        self.approval = policy;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn run(&self, incident: &IncidentRecord) -> IncidentTrace {
        let trace_id = Uuid::new_v4().to_string();
        let mut run = Run {
            engine: &self.engine,
            audit_sink: self.audit_sink.as_ref(),
            audit: AuditContext::new(
                Some(incident.scenario_id.clone()),
                trace_id.clone(),
                "incident-orchestrator",
            ),
            recorder: TraceRecorder::new(incident.scenario_id.clone(), trace_id.clone()),
            state: self.engine.initial_state(),
        };
        run.recorder.push_state(run.state);

        tracing::info!(
            event_name = "incident.run_started",
            correlation_id = %trace_id,
            incident_id = %incident.scenario_id,
            "incident run started"
        );

        if let Err(error) = self.drive(&mut run, incident).await {
            tracing::warn!(
                event_name = "incident.transition_rejected",
                correlation_id = %trace_id,
                incident_id = %incident.scenario_id,
                error = %error,
                "flow engine rejected transition, closing incident"
            );
            run.recorder.diagnostic("flow", error.to_string(), None);
        }

        let trace = run.close();
        tracing::info!(
            event_name = "incident.run_completed",
            correlation_id = %trace_id,
            incident_id = %incident.scenario_id,
            states = ?trace.state_names(),
            paid = trace.paid(),
            "incident run completed"
        );
        trace
    }

    /// Returning `Ok` at any point means "close now".
    async fn drive(
        &self,
        run: &mut Run<'_>,
        incident: &IncidentRecord,
    ) -> Result<(), FlowTransitionError> {
        let request = TriageRequest::from_incident(incident);
        let verdict = self.triage.evaluate(&request).await;
        if let Some(parse_error) = &verdict.parse_error {
            run.recorder.diagnostic("triage", parse_error.clone(), verdict.raw_response.clone());
        }
        let propose_self_help = !verdict.label.escalates();
        run.recorder.set_triage(TriageSummary {
            label: verdict.label,
            explanation: verdict.explanation.clone(),
            issue_type: verdict.issue_type,
            severity: verdict.severity,
            propose_self_help,
            must_escalate_immediately: !propose_self_help,
            kb_article: verdict.kb_article.clone(),
        });
        run.audit(
            "triage.verdict_recorded",
            AuditCategory::Triage,
            if verdict.parse_error.is_some() { AuditOutcome::Failed } else { AuditOutcome::Success },
            &[("label", verdict.label.as_str().to_owned())],
        );

        run.advance(IncidentEvent::TriageCompleted, &FlowContext::default())?;
        run.recorder.tenant(format!(
            "We've received your request: '{}'. We are analyzing the issue.",
            incident.tenant_input.title
        ));

        let mut selection = verdict.vendor_selection.clone();
        if verdict.label == TriageLabel::SelfHelpOk {
            run.advance(IncidentEvent::SelfHelpRecommended, &FlowContext::default())?;
            run.recorder.set_self_help(SelfHelpPlan {
                issue_type: verdict.issue_type,
                steps: verdict.self_help_steps.clone(),
                kb_article: verdict.kb_article.clone(),
                explanation: verdict.explanation.clone(),
            });
            run.recorder.tenant("Here are some safe steps you can try while we monitor the issue.");

            if incident.self_help_should_succeed() {
                run.advance(IncidentEvent::SelfHelpResolved, &FlowContext::default())?;
                run.recorder.tenant(
                    "Glad to hear the issue is resolved with those steps. We are closing the ticket.",
                );
                return Ok(());
            }

            run.advance(IncidentEvent::SelfHelpUnresolved, &FlowContext::default())?;
            run.recorder.tenant(
                "Looks like the steps did not fully resolve the issue. We will arrange a vendor visit.",
            );
            run.advance(IncidentEvent::EscalationRequired, &FlowContext::default())?;

            if verdict.matched_vendor().is_none() {
                selection = Some(self.rank_after_self_help(&verdict, incident));
            }
        } else {
            run.advance(IncidentEvent::EscalationRequired, &FlowContext::default())?;
        }

        if !incident.expects_vendor() {
            run.recorder
                .tenant("The issue is minor and will be monitored. No vendor visit is required.");
            return Ok(());
        }

        run.recorder.set_vendor_selection(selection.clone());
        let Some(vendor) = selection.as_ref().and_then(VendorSelection::vendor).cloned() else {
            run.recorder.landlord("No suitable vendor found for this issue type and location.");
            return Ok(());
        };

        run.advance(
            IncidentEvent::VendorChosen,
            &FlowContext { vendor_resolved: true, payment_settled: false },
        )?;
        run.recorder.landlord(format!(
            "Selected vendor {} ({}) for property {} and issue '{}'.",
            vendor.vendor_name,
            vendor.vendor_id,
            incident.property.property_id_or_unknown(),
            incident.tenant_input.title
        ));
        run.recorder.tenant(format!("We have selected vendor {} to handle your issue.", vendor.vendor_name));

        let severity = incident.expected_severity().or(verdict.severity).unwrap_or_default();
        let Some(quote) = self.request_quote(run, incident, &vendor, severity).await else {
            return Ok(());
        };
        run.advance(IncidentEvent::QuoteReceived, &FlowContext::default())?;

        let decision =
            evaluate_quote_budget(quote.total(), incident.max_budget(), self.approval.as_ref());
        run.recorder.landlord(decision.landlord_message(&vendor.vendor_name));
        let approved = decision.approved;
        run.recorder.set_approval(decision);
        if !approved {
            run.advance(IncidentEvent::QuoteOutsidePolicy, &FlowContext::default())?;
            return Ok(());
        }
        run.advance(IncidentEvent::QuoteWithinPolicy, &FlowContext::default())?;

        let Some(booking) = self.schedule(run, &vendor, &quote).await else {
            return Ok(());
        };
        run.advance(IncidentEvent::SlotBooked, &FlowContext::default())?;

        let Some(update) = self.poll_job(run, incident, &vendor, &quote, &booking).await else {
            run.advance(IncidentEvent::WorkFailed, &FlowContext::default())?;
            return Ok(());
        };
        if !update.status.is_completion() {
            run.advance(IncidentEvent::WorkFailed, &FlowContext::default())?;
            run.recorder.landlord(format!(
                "Vendor reported job status {} for {}.",
                update.status, incident.scenario_id
            ));
            return Ok(());
        }
        run.advance(IncidentEvent::WorkCompleted, &FlowContext::default())?;
        run.recorder.tenant(
            "The vendor has marked the work as completed. Please confirm if everything looks good.",
        );

        let outcome = settle_payment(incident, &vendor, &update, None, &self.settings.settlement);
        let message = outcome.landlord_message(&vendor.vendor_name);
        let paid = outcome.paid;
        match &outcome.payment {
            Some(payment) => run.audit(
                "payment.settled",
                AuditCategory::Payment,
                AuditOutcome::Success,
                &[("payment_id", payment.payment_id.0.clone()), ("amount", payment.amount.to_string())],
            ),
            None => run.audit(
                "payment.declined",
                AuditCategory::Payment,
                AuditOutcome::Rejected,
                &[("reasons", outcome.reason_codes().join(","))],
            ),
        }
        run.recorder.set_payment(outcome);
        if paid {
            if self.settings.record_paid_state {
                run.advance(
                    IncidentEvent::PaymentSettled,
                    &FlowContext { vendor_resolved: true, payment_settled: true },
                )?;
            }
            run.recorder.landlord(message);
            run.recorder.tenant("Payment to the vendor has been processed by your landlord. Thank you!");
        } else {
            run.recorder.landlord(message);
        }
        Ok(())
    }

    fn rank_after_self_help(
        &self,
        verdict: &TriageVerdict,
        incident: &IncidentRecord,
    ) -> VendorSelection {
        let issue_type = verdict.issue_type.unwrap_or(IssueType::Appliance);
        let severity = verdict.severity.unwrap_or(Severity::Medium);
        self.ranker.rank(issue_type, incident.property.zip_or_placeholder(), severity)
    }

    async fn request_quote(
        &self,
        run: &mut Run<'_>,
        incident: &IncidentRecord,
        vendor: &SelectedVendor,
        severity: Severity,
    ) -> Option<Quote> {
        let request = QuoteRequest {
            vendor_id: vendor.vendor_id.clone(),
            service_type: vendor.service_type,
            issue_description: incident.tenant_input.description.clone(),
            property_zip: incident.property.zip_or_placeholder().to_owned(),
            severity,
        };
        let response = self.vendor_service.request_quote(&request).await.and_then(|quote| {
            quote.estimate.validate().map_err(|message| VendorServiceError::Decode {
                message,
                raw: serde_json::to_string(&quote.estimate).unwrap_or_default(),
            })?;
            Ok(quote)
        });
        match response {
            Ok(quote) => {
                run.vendor_ok(
                    "request_quote",
                    format!("{} total {:.2}", quote.quote_id.0, quote.total()),
                );
                run.recorder.set_quote(quote.clone());
                Some(quote)
            }
            Err(error) => {
                run.vendor_failure("request_quote", &error);
                run.recorder.landlord(format!(
                    "Vendor {} could not provide a quote: {error}.",
                    vendor.vendor_name
                ));
                None
            }
        }
    }

    /// Books the earliest slot. `None` means scheduling failed and was reported.
    async fn schedule(
        &self,
        run: &mut Run<'_>,
        vendor: &SelectedVendor,
        quote: &Quote,
    ) -> Option<Booking> {
        let availability = AvailabilityRequest {
            vendor_id: vendor.vendor_id.clone(),
            service_type: vendor.service_type,
            quote_id: quote.quote_id.clone(),
        };
        let slots = match self.vendor_service.get_availability(&availability).await {
            Ok(slots) => slots,
            Err(error) => {
                run.vendor_failure("get_availability", &error);
                run.booking_failed(vendor, &error.to_string());
                return None;
            }
        };
        run.vendor_ok("get_availability", format!("{} slots offered", slots.len()));
        let Some(slot) = slots.into_iter().next() else {
            run.recorder.diagnostic("get_availability", "vendor offered no slots", None);
            run.booking_failed(vendor, "no availability offered");
            return None;
        };

        let booking = BookingRequest {
            vendor_id: vendor.vendor_id.clone(),
            quote_id: quote.quote_id.clone(),
            slot_id: slot.slot_id.clone(),
            tenant_name: self.settings.tenant_name.clone(),
            tenant_phone: self.settings.tenant_phone.clone(),
            special_instructions: String::new(),
        };
        match self.vendor_service.book_slot(&booking).await {
            Ok(booking) => {
                run.vendor_ok(
                    "book_slot",
                    format!("{} {}", booking.booking_id.0, booking.confirmation_code),
                );
                let (date, from, to) = slot.window_label();
                run.recorder.set_booking(booking.clone());
                run.recorder.set_chosen_slot(slot);
                run.recorder
                    .tenant(format!("Your appointment is scheduled on {date} from {from} to {to}."));
                Some(booking)
            }
            Err(error) => {
                run.vendor_failure("book_slot", &error);
                run.booking_failed(vendor, &error.to_string());
                None
            }
        }
    }

    async fn poll_job(
        &self,
        run: &mut Run<'_>,
        incident: &IncidentRecord,
        vendor: &SelectedVendor,
        quote: &Quote,
        booking: &Booking,
    ) -> Option<JobUpdate> {
        let request = JobStatusRequest {
            incident_id: incident.scenario_id.clone(),
            vendor_id: vendor.vendor_id.clone(),
            job_id: booking.job_id.clone(),
            quote_id: quote.quote_id.clone(),
            quoted_total: quote.total(),
        };
        match self.vendor_service.job_status(&request).await {
            Ok(update) => {
                run.vendor_ok("job_status", update.status.as_str());
                run.recorder.set_job_update(update.clone());
                Some(update)
            }
            Err(error) => {
                run.vendor_failure("job_status", &error);
                run.recorder.landlord(format!(
                    "Vendor {} did not report a job status for {}: {error}.",
                    vendor.vendor_name, incident.scenario_id
                ));
                None
            }
        }
    }
}

struct Run<'a> {
    engine: &'a FlowEngine<IncidentFlow>,
    audit_sink: &'a dyn AuditSink,
    audit: AuditContext,
    recorder: TraceRecorder,
    state: IncidentState,
}

impl Run<'_> {
    fn advance(
        &mut self,
        event: IncidentEvent,
        context: &FlowContext,
    ) -> Result<(), FlowTransitionError> {
        let outcome =
            self.engine.apply_with_audit(&self.state, &event, context, self.audit_sink, &self.audit)?;
        self.state = outcome.to;
        self.recorder.push_state(outcome.to);
        tracing::debug!(
            event_name = "incident.state_entered",
            correlation_id = %self.audit.correlation_id,
            from = outcome.from.as_str(),
            to = outcome.to.as_str(),
            "incident transitioned"
        );
        Ok(())
    }

    fn audit(
        &self,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: &[(&str, String)],
    ) {
        let event = metadata.iter().fold(
            self.audit.event(event_type, category, outcome),
            |event, (key, value)| event.with_metadata(*key, value.clone()),
        );
        self.audit_sink.emit(event);
    }

    fn vendor_ok(&mut self, operation: &str, detail: impl Into<String>) {
        let detail = detail.into();
        self.audit(
            "vendor.call_completed",
            AuditCategory::Vendor,
            AuditOutcome::Success,
            &[("operation", operation.to_owned()), ("detail", detail.clone())],
        );
        self.recorder.vendor_call(operation, CallOutcome::Ok, detail);
    }

    fn vendor_failure(&mut self, operation: &str, error: &VendorServiceError) {
        self.audit(
            "vendor.call_failed",
            AuditCategory::Vendor,
            AuditOutcome::Failed,
            &[("operation", operation.to_owned()), ("error", error.to_string())],
        );
        tracing::warn!(
            event_name = "vendor_service.call_failed",
            correlation_id = %self.audit.correlation_id,
            operation,
            error = %error,
            "vendor service call failed"
        );
        self.recorder.vendor_call(operation, CallOutcome::Failed, error.to_string());
        self.recorder.diagnostic(operation, error.to_string(), error.raw_text().map(str::to_owned));
    }

    fn booking_failed(&mut self, vendor: &SelectedVendor, reason: &str) {
        self.recorder.landlord(format!(
            "Booking with vendor {} could not be completed: {reason}.",
            vendor.vendor_name
        ));
    }

    fn close(mut self) -> IncidentTrace {
        if !self.state.is_terminal() {
            if let Err(error) = self.advance(IncidentEvent::CloseRequested, &FlowContext::default())
            {
                self.recorder.diagnostic("flow", error.to_string(), None);
                self.recorder.push_state(IncidentState::Closed);
            }
        }
        self.recorder.finish()
    }
}
