use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VendorId(pub String);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Electrician,
    Plumber,
    Hvac,
    GasTechnician,
    ApplianceRepair,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electrician => "ELECTRICIAN",
            Self::Plumber => "PLUMBER",
            Self::Hvac => "HVAC",
            Self::GasTechnician => "GAS_TECHNICIAN",
            Self::ApplianceRepair => "APPLIANCE_REPAIR",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "ELECTRICIAN" => Ok(Self::Electrician),
            "PLUMBER" => Ok(Self::Plumber),
            "HVAC" => Ok(Self::Hvac),
            "GAS_TECHNICIAN" => Ok(Self::GasTechnician),
            "APPLIANCE_REPAIR" => Ok(Self::ApplianceRepair),
            other => Err(format!("unsupported service type `{other}`")),
        }
    }
}

/// One row of the vendor reference table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VendorRecord {
    pub vendor_id: VendorId,
    pub name: String,
    pub service_type: ServiceType,
    pub zip: u32,
    pub radius_km: u32,
    pub rating: f64,
    /// Ordinal tier, 1 is the cheapest.
    pub price_band: u8,
    /// Ordinal, higher responds faster.
    pub speed_score: u8,
    pub base_fee: Decimal,
    pub hourly_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedVendor {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub service_type: ServiceType,
    pub rating: f64,
    pub estimated_response_time: String,
    pub price_band: u8,
    pub explanation: String,
}

impl SelectedVendor {
    pub fn from_record(record: &VendorRecord, explanation: impl Into<String>) -> Self {
        Self {
            vendor_id: record.vendor_id.clone(),
            vendor_name: record.name.clone(),
            service_type: record.service_type,
            rating: record.rating,
            estimated_response_time: format!("{} hours", record.speed_score),
            price_band: record.price_band,
            explanation: explanation.into(),
        }
    }
}

/// Outcome of vendor selection. Identity fields only exist on `Matched`, so a
/// vendor id can never appear without its name and trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VendorSelection {
    Matched(SelectedVendor),
    NoMatch { service_type: Option<ServiceType>, explanation: String },
}

impl VendorSelection {
    pub fn vendor(&self) -> Option<&SelectedVendor> {
        match self {
            Self::Matched(vendor) => Some(vendor),
            Self::NoMatch { .. } => None,
        }
    }

    pub fn vendor_id(&self) -> Option<&VendorId> {
        self.vendor().map(|vendor| &vendor.vendor_id)
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        match self {
            Self::Matched(vendor) => Some(vendor.service_type),
            Self::NoMatch { service_type, .. } => *service_type,
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            Self::Matched(vendor) => &vendor.explanation,
            Self::NoMatch { explanation, .. } => explanation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceType, VendorSelection};

    #[test]
    fn service_type_parses_loose_spellings() {
        assert_eq!("hvac".parse::<ServiceType>(), Ok(ServiceType::Hvac));
        assert_eq!("gas technician".parse::<ServiceType>(), Ok(ServiceType::GasTechnician));
        assert_eq!("appliance-repair".parse::<ServiceType>(), Ok(ServiceType::ApplianceRepair));
        assert!("roofer".parse::<ServiceType>().is_err());
    }

    #[test]
    fn no_match_carries_explanation_without_identity() {
        let selection = VendorSelection::NoMatch {
            service_type: Some(ServiceType::Plumber),
            explanation: "No vendors available for PLUMBER service.".to_owned(),
        };
        assert!(selection.vendor_id().is_none());
        assert_eq!(selection.service_type(), Some(ServiceType::Plumber));
        assert!(!selection.explanation().is_empty());
    }
}
