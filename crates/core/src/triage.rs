//! Triage collaborator boundary.
//!
//! Oracles never fail: anything unusable upstream degrades to a
//! `VENDOR_REQUIRED` verdict that keeps the raw text for diagnostics.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::incident::{IncidentId, IncidentRecord, IssueType, Severity};
use crate::domain::vendor::VendorSelection;

pub const PARSE_FALLBACK_EXPLANATION: &str = "Default decision because parsing failed.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageLabel {
    SelfHelpOk,
    VendorRequired,
    Emergency,
}

impl TriageLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfHelpOk => "SELF_HELP_OK",
            Self::VendorRequired => "VENDOR_REQUIRED",
            Self::Emergency => "EMERGENCY",
        }
    }

    pub fn escalates(&self) -> bool {
        !matches!(self, Self::SelfHelpOk)
    }
}

impl fmt::Display for TriageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLabel {
    type Err = TriageParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SELF_HELP_OK" => Ok(Self::SelfHelpOk),
            "VENDOR_REQUIRED" => Ok(Self::VendorRequired),
            "EMERGENCY" => Ok(Self::Emergency),
            _ => Err(TriageParseError::UnknownLabel(value.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRequest {
    pub incident_id: IncidentId,
    pub property_id: String,
    pub property_zip: String,
    pub priority: String,
    pub title: String,
    pub description: String,
}

impl TriageRequest {
    pub fn from_incident(incident: &IncidentRecord) -> Self {
        Self {
            incident_id: incident.scenario_id.clone(),
            property_id: incident.property.property_id_or_unknown().to_owned(),
            property_zip: incident.property.zip_or_placeholder().to_owned(),
            priority: incident.priority().to_owned(),
            title: incident.tenant_input.title.clone(),
            description: incident.tenant_input.description.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeArticleRef {
    pub article_id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageVerdict {
    pub label: TriageLabel,
    pub explanation: String,
    #[serde(default)]
    pub self_help_steps: Vec<String>,
    #[serde(default)]
    pub kb_article: Option<KnowledgeArticleRef>,
    #[serde(default)]
    pub vendor_selection: Option<VendorSelection>,
    #[serde(default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub raw_response: Option<String>,
    /// Set when the upstream answer could not be used as-is.
    #[serde(default)]
    pub parse_error: Option<String>,
}

impl TriageVerdict {
    pub fn fallback(raw_response: Option<String>, parse_error: impl Into<String>) -> Self {
        Self {
            label: TriageLabel::VendorRequired,
            explanation: PARSE_FALLBACK_EXPLANATION.to_owned(),
            self_help_steps: Vec::new(),
            kb_article: None,
            vendor_selection: None,
            issue_type: None,
            severity: None,
            raw_response,
            parse_error: Some(parse_error.into()),
        }
    }

    /// Vendor already resolved by triage, if any.
    pub fn matched_vendor(&self) -> Option<&VendorSelection> {
        self.vendor_selection.as_ref().filter(|selection| selection.vendor_id().is_some())
    }
}

#[async_trait]
pub trait TriageOracle: Send + Sync {
    async fn evaluate(&self, request: &TriageRequest) -> TriageVerdict;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriageParseError {
    #[error("triage response was empty")]
    Empty,
    #[error("triage response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("unknown triage label `{0}`")]
    UnknownLabel(String),
}

/// Vendor block as an LLM reports it; every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RawVendorSelection {
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Loosely typed triage answer, before guardrails run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTriage {
    pub label: TriageLabel,
    pub explanation: String,
    pub self_help_steps: Vec<String>,
    pub kb_article: Option<KnowledgeArticleRef>,
    pub vendor_selection: Option<RawVendorSelection>,
}

#[derive(Deserialize)]
struct TriageWire {
    #[serde(default)]
    triage_label: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    self_help_steps: Option<Vec<String>>,
    #[serde(default)]
    kb_article_id: Option<String>,
    #[serde(default)]
    kb_article_title: Option<String>,
    #[serde(default)]
    vendor_selection: Option<RawVendorSelection>,
}

/// Removes a surrounding markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest.trim();
    }
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim();
    }
    cleaned
}

pub fn parse_triage_response(text: &str) -> Result<ParsedTriage, TriageParseError> {
    let cleaned = strip_code_fence(text);
    if cleaned.is_empty() {
        return Err(TriageParseError::Empty);
    }
    let wire: TriageWire = serde_json::from_str(cleaned)
        .map_err(|error| TriageParseError::InvalidJson(error.to_string()))?;

    let label = match wire.triage_label.as_deref() {
        Some(raw) => raw.parse()?,
        None => TriageLabel::VendorRequired,
    };
    let kb_article = match (wire.kb_article_id, wire.kb_article_title) {
        (Some(article_id), title) => {
            Some(KnowledgeArticleRef { article_id, title: title.unwrap_or_default() })
        }
        (None, _) => None,
    };

    Ok(ParsedTriage {
        label,
        explanation: wire.explanation.unwrap_or_default(),
        self_help_steps: wire.self_help_steps.unwrap_or_default(),
        kb_article,
        vendor_selection: wire.vendor_selection,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        parse_triage_response, strip_code_fence, TriageLabel, TriageParseError, TriageVerdict,
        PARSE_FALLBACK_EXPLANATION,
    };

    #[test]
    fn fences_are_stripped_with_and_without_tag() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn fenced_self_help_answer_parses() {
        let parsed = parse_triage_response(
            r#"```json
            {
              "triage_label": "SELF_HELP_OK",
              "explanation": "Minor leak",
              "self_help_steps": ["Turn off the valve"],
              "kb_article_id": "kb_leak_01",
              "kb_article_title": "Minor sink leak under kitchen",
              "vendor_selection": null
            }
            ```"#,
        )
        .expect("parses");

        assert_eq!(parsed.label, TriageLabel::SelfHelpOk);
        assert_eq!(parsed.self_help_steps, vec!["Turn off the valve"]);
        assert_eq!(parsed.kb_article.map(|article| article.article_id), Some("kb_leak_01".to_owned()));
        assert!(parsed.vendor_selection.is_none());
    }

    #[test]
    fn vendor_block_with_null_id_is_preserved_raw() {
        let parsed = parse_triage_response(
            r#"{"triage_label":"EMERGENCY","explanation":"gas","self_help_steps":[],
                "vendor_selection":{"vendor_id":null,"explanation":"none"}}"#,
        )
        .expect("parses");
        let vendor = parsed.vendor_selection.expect("vendor block");
        assert!(vendor.vendor_id.is_none());
        assert!(parsed.label.escalates());
    }

    #[test]
    fn garbage_and_unknown_labels_are_errors() {
        assert!(matches!(
            parse_triage_response("I think a plumber"),
            Err(TriageParseError::InvalidJson(_))
        ));
        assert_eq!(parse_triage_response("```\n```"), Err(TriageParseError::Empty));
        assert_eq!(
            parse_triage_response(r#"{"triage_label":"MAYBE"}"#),
            Err(TriageParseError::UnknownLabel("MAYBE".to_owned()))
        );
    }

    #[test]
    fn fallback_verdict_escalates_and_keeps_raw_text() {
        let verdict = TriageVerdict::fallback(Some("oops".to_owned()), "not json");
        assert_eq!(verdict.label, TriageLabel::VendorRequired);
        assert_eq!(verdict.explanation, PARSE_FALLBACK_EXPLANATION);
        assert_eq!(verdict.raw_response.as_deref(), Some("oops"));
        assert!(verdict.matched_vendor().is_none());
    }
}
