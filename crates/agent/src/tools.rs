use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use upkeep_core::catalog::VendorCatalog;
use upkeep_core::domain::incident::{IssueType, Severity};
use upkeep_core::domain::vendor::VendorSelection;
use upkeep_core::ranking::VendorRanker;

use crate::knowledge::KnowledgeBase;

pub const KB_LOOKUP_TOOL: &str = "lookup_troubleshooting_article";
pub const VENDOR_SELECTION_TOOL: &str = "select_best_vendor";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the knowledge-base and vendor-selection tools.
    pub fn triage_defaults(catalog: Arc<VendorCatalog>) -> Self {
        let mut registry = Self::default();
        registry.register(KnowledgeLookupTool::default());
        registry.register(VendorSelectionTool::new(VendorRanker::new(catalog)));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        tool.execute(input).await.with_context(|| format!("tool `{name}` failed"))
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct KnowledgeLookupTool {
    kb: KnowledgeBase,
}

#[derive(Deserialize)]
struct KnowledgeLookupInput {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl Tool for KnowledgeLookupTool {
    fn name(&self) -> &'static str {
        KB_LOOKUP_TOOL
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: KnowledgeLookupInput =
            serde_json::from_value(input).context("invalid knowledge lookup input")?;
        let output = match self.kb.lookup(&input.title, &input.description) {
            Some(article) => json!({
                "article_id": article.article_id,
                "article_title": article.title,
                "suggested_steps": article.steps,
            }),
            None => json!({
                "article_id": null,
                "article_title": null,
                "suggested_steps": [],
            }),
        };
        Ok(output)
    }
}

pub struct VendorSelectionTool {
    ranker: VendorRanker,
}

impl VendorSelectionTool {
    pub fn new(ranker: VendorRanker) -> Self {
        Self { ranker }
    }
}

#[derive(Deserialize)]
struct VendorSelectionInput {
    issue_type: String,
    #[serde(default)]
    property_zip: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

#[async_trait]
impl Tool for VendorSelectionTool {
    fn name(&self) -> &'static str {
        VENDOR_SELECTION_TOOL
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: VendorSelectionInput =
            serde_json::from_value(input).context("invalid vendor selection input")?;
        let issue_type = IssueType::parse_lenient(&input.issue_type);
        let severity = input.severity.as_deref().map(Severity::parse_lenient).unwrap_or_default();
        let zip = input.property_zip.as_deref().unwrap_or("00000");

        let output = match self.ranker.rank(issue_type, zip, severity) {
            VendorSelection::Matched(vendor) => json!({
                "vendor_id": vendor.vendor_id.0,
                "vendor_name": vendor.vendor_name,
                "service_type": vendor.service_type.as_str(),
                "explanation": vendor.explanation,
            }),
            VendorSelection::NoMatch { service_type, explanation } => json!({
                "vendor_id": null,
                "vendor_name": null,
                "service_type": service_type.map(|service_type| service_type.as_str()),
                "explanation": explanation,
            }),
        };
        Ok(output)
    }
}
