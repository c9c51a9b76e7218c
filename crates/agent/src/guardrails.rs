use std::sync::Arc;

use upkeep_core::catalog::VendorCatalog;
use upkeep_core::domain::vendor::{SelectedVendor, ServiceType, VendorId, VendorSelection};
use upkeep_core::triage::{ParsedTriage, RawVendorSelection, TriageVerdict};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailFinding {
    StepsOnEscalation { dropped: usize },
    UnknownVendor { vendor_id: String },
    ServiceTypeMismatch { vendor_id: String, claimed: String },
}

impl GuardrailFinding {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::StepsOnEscalation { .. } => "self_help_steps_on_escalation",
            Self::UnknownVendor { .. } => "vendor_not_in_catalog",
            Self::ServiceTypeMismatch { .. } => "vendor_service_type_mismatch",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuardedVerdict {
    pub verdict: TriageVerdict,
    pub findings: Vec<GuardrailFinding>,
}

/// Turns a loosely parsed LLM answer into a verdict the orchestrator can
/// trust. Vendor identity always comes from the catalog, never the model.
#[derive(Clone, Debug)]
pub struct TriageGuardrails {
    catalog: Arc<VendorCatalog>,
}

impl TriageGuardrails {
    pub fn new(catalog: Arc<VendorCatalog>) -> Self {
        Self { catalog }
    }

    pub fn apply(&self, parsed: ParsedTriage, raw_response: &str) -> GuardedVerdict {
        let mut findings = Vec::new();
        let mut steps = parsed.self_help_steps;
        if parsed.label.escalates() && !steps.is_empty() {
            findings.push(GuardrailFinding::StepsOnEscalation { dropped: steps.len() });
            steps.clear();
        }

        let vendor_selection =
            parsed.vendor_selection.map(|raw| self.resolve_vendor(raw, &mut findings));

        for finding in &findings {
            tracing::warn!(
                event_name = "triage.guardrail_applied",
                reason_code = finding.reason_code(),
                finding = ?finding,
                "triage guardrail adjusted llm answer"
            );
        }

        GuardedVerdict {
            verdict: TriageVerdict {
                label: parsed.label,
                explanation: parsed.explanation,
                self_help_steps: steps,
                kb_article: parsed.kb_article,
                vendor_selection,
                issue_type: None,
                severity: None,
                raw_response: Some(raw_response.to_owned()),
                parse_error: None,
            },
            findings,
        }
    }

    fn resolve_vendor(
        &self,
        raw: RawVendorSelection,
        findings: &mut Vec<GuardrailFinding>,
    ) -> VendorSelection {
        let claimed_service =
            raw.service_type.as_deref().and_then(|value| value.parse::<ServiceType>().ok());
        let explanation = raw.explanation.unwrap_or_default();

        let Some(vendor_id) = raw.vendor_id.filter(|id| !id.trim().is_empty()) else {
            return no_match(claimed_service, explanation, "No vendor was selected.");
        };

        let Some(record) = self.catalog.find(&VendorId(vendor_id.clone())) else {
            let message = format!("Vendor `{vendor_id}` is not in the vendor catalog.");
            findings.push(GuardrailFinding::UnknownVendor { vendor_id });
            return VendorSelection::NoMatch { service_type: claimed_service, explanation: message };
        };

        if let (Some(claimed), Some(text)) = (claimed_service, raw.service_type.as_deref()) {
            if claimed != record.service_type {
                findings.push(GuardrailFinding::ServiceTypeMismatch {
                    vendor_id: vendor_id.clone(),
                    claimed: text.to_owned(),
                });
            }
        }

        let explanation = if explanation.trim().is_empty() {
            format!("Selected {} for {} service.", record.name, record.service_type)
        } else {
            explanation
        };
        VendorSelection::Matched(SelectedVendor::from_record(record, explanation))
    }
}

fn no_match(
    service_type: Option<ServiceType>,
    explanation: String,
    fallback: &str,
) -> VendorSelection {
    let explanation =
        if explanation.trim().is_empty() { fallback.to_owned() } else { explanation };
    VendorSelection::NoMatch { service_type, explanation }
}
