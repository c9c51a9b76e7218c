//! Triage oracles: an offline rule-based one and an LLM-backed one.
//!
//! Both share the same keyword classifier, knowledge base and ranker. The LLM
//! oracle only adds a model in the middle, whose answer is always passed
//! through [`TriageGuardrails`] before the orchestrator sees it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::domain::incident::Severity;
use upkeep_core::ranking::VendorRanker;
use upkeep_core::triage::{
    parse_triage_response, TriageLabel, TriageOracle, TriageRequest, TriageVerdict,
};

use crate::classifier::{IssueClassification, IssueClassifier};
use crate::guardrails::TriageGuardrails;
use crate::knowledge::KnowledgeBase;
use crate::llm::LlmClient;
use crate::tools::{ToolRegistry, KB_LOOKUP_TOOL, VENDOR_SELECTION_TOOL};

pub const TRIAGE_SYSTEM_PROMPT: &str = "\
You triage residential maintenance requests for a property manager.
Decide one label:
- SELF_HELP_OK: the tenant can safely resolve it with simple steps.
- VENDOR_REQUIRED: a professional must visit, but nobody is at risk.
- EMERGENCY: safety risk or rapidly worsening damage (gas, fire, flooding, extreme heat).
Use the troubleshooting article and vendor recommendation you are given; never invent
vendor ids. Give self-help steps only for SELF_HELP_OK.
Answer with a single JSON object and nothing else:
{
  \"triage_label\": \"SELF_HELP_OK\" | \"VENDOR_REQUIRED\" | \"EMERGENCY\",
  \"explanation\": string,
  \"self_help_steps\": [string],
  \"kb_article_id\": string | null,
  \"kb_article_title\": string | null,
  \"vendor_selection\": {
    \"vendor_id\": string | null,
    \"vendor_name\": string | null,
    \"service_type\": string | null,
    \"explanation\": string
  } | null
}";

/// Deterministic triage without any model.
pub struct RuleBasedTriageOracle {
    classifier: IssueClassifier,
    kb: KnowledgeBase,
    ranker: VendorRanker,
}

impl RuleBasedTriageOracle {
    pub fn new(catalog: Arc<VendorCatalog>) -> Self {
        Self {
            classifier: IssueClassifier::new(),
            kb: KnowledgeBase::default(),
            ranker: VendorRanker::new(catalog),
        }
    }

    fn escalate(
        &self,
        request: &TriageRequest,
        classification: IssueClassification,
        label: TriageLabel,
        explanation: String,
    ) -> TriageVerdict {
        let selection = self.ranker.rank(
            classification.issue_type,
            &request.property_zip,
            classification.severity,
        );
        TriageVerdict {
            label,
            explanation,
            self_help_steps: Vec::new(),
            kb_article: None,
            vendor_selection: Some(selection),
            issue_type: Some(classification.issue_type),
            severity: Some(classification.severity),
            raw_response: None,
            parse_error: None,
        }
    }
}

#[async_trait]
impl TriageOracle for RuleBasedTriageOracle {
    async fn evaluate(&self, request: &TriageRequest) -> TriageVerdict {
        let classification = self.classifier.classify(&request.title, &request.description);
        tracing::debug!(
            event_name = "triage.classified",
            incident_id = %request.incident_id,
            issue_type = classification.issue_type.as_str(),
            severity = classification.severity.as_str(),
            "rule-based classification"
        );

        if classification.must_escalate_immediately {
            let label = if classification.severity == Severity::Critical {
                TriageLabel::Emergency
            } else {
                TriageLabel::VendorRequired
            };
            let explanation = format!(
                "{} issue at {} severity needs a professional right away.",
                classification.issue_type, classification.severity
            );
            return self.escalate(request, classification, label, explanation);
        }

        if classification.propose_self_help {
            if let Some(article) = self.kb.lookup(&request.title, &request.description) {
                return TriageVerdict {
                    label: TriageLabel::SelfHelpOk,
                    explanation: format!(
                        "Tenant can try the \"{}\" troubleshooting steps first.",
                        article.title
                    ),
                    self_help_steps: article.steps(),
                    kb_article: Some(article.reference()),
                    vendor_selection: None,
                    issue_type: Some(classification.issue_type),
                    severity: Some(classification.severity),
                    raw_response: None,
                    parse_error: None,
                };
            }
            let explanation = format!(
                "No troubleshooting article covers this {} issue; sending a vendor.",
                classification.issue_type
            );
            return self.escalate(request, classification, TriageLabel::VendorRequired, explanation);
        }

        let explanation =
            format!("Unrecognised {} issue; a vendor must assess it.", classification.issue_type);
        self.escalate(request, classification, TriageLabel::VendorRequired, explanation)
    }
}

/// Model-backed triage. The model sees tool outputs but its answer is
/// reconciled against the catalog before use.
pub struct LlmTriageOracle {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    guardrails: TriageGuardrails,
    classifier: IssueClassifier,
}

impl LlmTriageOracle {
    pub fn new(llm: Arc<dyn LlmClient>, catalog: Arc<VendorCatalog>) -> Self {
        Self {
            llm,
            tools: ToolRegistry::triage_defaults(catalog.clone()),
            guardrails: TriageGuardrails::new(catalog),
            classifier: IssueClassifier::new(),
        }
    }

    async fn tool_output(&self, request: &TriageRequest, name: &str, input: Value) -> Value {
        match self.tools.execute(name, input).await {
            Ok(output) => output,
            Err(error) => {
                tracing::warn!(
                    event_name = "triage.tool_failed",
                    incident_id = %request.incident_id,
                    tool = name,
                    error = %error,
                    "triage tool failed; continuing without it"
                );
                Value::Null
            }
        }
    }

    async fn user_prompt(
        &self,
        request: &TriageRequest,
        classification: IssueClassification,
    ) -> String {
        let article = self
            .tool_output(
                request,
                KB_LOOKUP_TOOL,
                json!({"title": request.title, "description": request.description}),
            )
            .await;
        let vendor = self
            .tool_output(
                request,
                VENDOR_SELECTION_TOOL,
                json!({
                    "issue_type": classification.issue_type.as_str(),
                    "property_zip": request.property_zip,
                    "severity": classification.severity.as_str(),
                }),
            )
            .await;

        format!(
            "Property ID: {}\nProperty ZIP: {}\nCurrent priority: {}\n\nTitle: {}\nDescription: {}\n\n\
             Keyword hint: issue_type={}, severity={}\n\
             Troubleshooting article: {article}\nVendor recommendation: {vendor}",
            request.property_id,
            request.property_zip,
            request.priority,
            request.title,
            request.description,
            classification.issue_type,
            classification.severity,
        )
    }
}

#[async_trait]
impl TriageOracle for LlmTriageOracle {
    async fn evaluate(&self, request: &TriageRequest) -> TriageVerdict {
        let classification = self.classifier.classify(&request.title, &request.description);
        let prompt = self.user_prompt(request, classification).await;

        let mut verdict = match self.llm.complete(TRIAGE_SYSTEM_PROMPT, &prompt).await {
            Err(error) => {
                tracing::warn!(
                    event_name = "triage.llm_failed",
                    incident_id = %request.incident_id,
                    error = %error,
                    "llm call failed; falling back to vendor required"
                );
                TriageVerdict::fallback(None, format!("llm call failed: {error:#}"))
            }
            Ok(raw) => match parse_triage_response(&raw) {
                Ok(parsed) => self.guardrails.apply(parsed, &raw).verdict,
                Err(error) => {
                    tracing::warn!(
                        event_name = "triage.parse_failed",
                        incident_id = %request.incident_id,
                        error = %error,
                        "llm answer unusable; falling back to vendor required"
                    );
                    TriageVerdict::fallback(Some(raw), error.to_string())
                }
            },
        };

        verdict.issue_type = Some(classification.issue_type);
        verdict.severity = Some(classification.severity);
        verdict
    }
}
