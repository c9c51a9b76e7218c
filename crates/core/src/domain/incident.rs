use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vendor::ServiceType;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub String);

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Electrical,
    Appliance,
    Plumbing,
    Gas,
    Hvac,
    Other,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrical => "ELECTRICAL",
            Self::Appliance => "APPLIANCE",
            Self::Plumbing => "PLUMBING",
            Self::Gas => "GAS",
            Self::Hvac => "HVAC",
            Self::Other => "OTHER",
        }
    }

    /// Trade that handles this kind of issue. `Other` has none.
    pub fn service_type(&self) -> Option<ServiceType> {
        match self {
            Self::Electrical => Some(ServiceType::Electrician),
            Self::Appliance => Some(ServiceType::ApplianceRepair),
            Self::Plumbing => Some(ServiceType::Plumber),
            Self::Gas => Some(ServiceType::GasTechnician),
            Self::Hvac => Some(ServiceType::Hvac),
            Self::Other => None,
        }
    }

    /// Lenient parse used at collaborator boundaries; unknown labels become `Other`.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Other)
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ELECTRICAL" => Ok(Self::Electrical),
            "APPLIANCE" => Ok(Self::Appliance),
            "PLUMBING" => Ok(Self::Plumbing),
            "GAS" => Ok(Self::Gas),
            "HVAC" => Ok(Self::Hvac),
            "OTHER" => Ok(Self::Other),
            other => Err(format!(
                "unsupported issue type `{other}` (expected electrical|appliance|plumbing|gas|hvac|other)"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Unknown severities fall back to `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            other => {
                Err(format!("unsupported severity `{other}` (expected low|medium|high|critical)"))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInput {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority_hint: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl PropertyDescriptor {
    pub fn property_id_or_unknown(&self) -> &str {
        self.property_id.as_deref().unwrap_or("UNKNOWN")
    }

    pub fn zip_or_placeholder(&self) -> &str {
        self.zip.as_deref().unwrap_or("00000")
    }
}

/// Evaluation-time expectations. Orchestration only reads the outcome signals
/// and budget fallback from here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentExpectations {
    #[serde(default)]
    pub self_help_should_succeed: bool,
    #[serde(default)]
    pub expected_vendor_service_type: Option<String>,
    #[serde(default)]
    pub max_budget: Option<Decimal>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub scenario_id: IncidentId,
    pub tenant_input: TenantInput,
    #[serde(default)]
    pub property: PropertyDescriptor,
    #[serde(default, alias = "ground_truth")]
    pub expectations: Option<IncidentExpectations>,
}

impl IncidentRecord {
    pub fn max_budget(&self) -> Option<Decimal> {
        self.expectations.as_ref().and_then(|expectations| expectations.max_budget)
    }

    pub fn self_help_should_succeed(&self) -> bool {
        self.expectations.as_ref().is_some_and(|expectations| expectations.self_help_should_succeed)
    }

    /// True when the incident carries any expected vendor trade at all.
    pub fn expects_vendor(&self) -> bool {
        self.expectations
            .as_ref()
            .and_then(|expectations| expectations.expected_vendor_service_type.as_deref())
            .is_some_and(|service_type| !service_type.trim().is_empty())
    }

    pub fn expected_severity(&self) -> Option<Severity> {
        self.expectations.as_ref().and_then(|expectations| expectations.severity)
    }

    pub fn priority(&self) -> &str {
        self.tenant_input.priority_hint.as_deref().unwrap_or("MEDIUM")
    }
}
