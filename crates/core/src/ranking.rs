//! Multi-criteria vendor ranking.
//!
//! Candidates of the required trade are ordered by locality first and a
//! weighted utility second. The sort is stable, so equal candidates keep
//! catalog order and identical inputs always select the same vendor.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::VendorCatalog;
use crate::domain::incident::{IssueType, Severity};
use crate::domain::vendor::{SelectedVendor, VendorRecord, VendorSelection};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilityWeights {
    pub rating: f64,
    pub speed: f64,
    pub price_band: f64,
}

impl UtilityWeights {
    pub const STANDARD: Self = Self { rating: 2.0, speed: 1.5, price_band: 1.0 };
    pub const CRITICAL: Self = Self { rating: 2.5, speed: 2.0, price_band: 0.5 };

    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::CRITICAL,
            Severity::Low | Severity::Medium | Severity::High => Self::STANDARD,
        }
    }

    pub fn score(&self, vendor: &VendorRecord) -> f64 {
        self.rating * vendor.rating + self.speed * f64::from(vendor.speed_score)
            - self.price_band * f64::from(vendor.price_band)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub vendor: VendorRecord,
    pub zip_match: bool,
    pub utility: f64,
}

#[derive(Clone, Debug)]
pub struct VendorRanker {
    catalog: Arc<VendorCatalog>,
}

impl VendorRanker {
    pub fn new(catalog: Arc<VendorCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<VendorCatalog> {
        &self.catalog
    }

    /// Full ordering of eligible vendors, best first. Empty when the issue has
    /// no trade or the trade has no vendors.
    pub fn ranked_candidates(
        &self,
        issue_type: IssueType,
        property_zip: &str,
        severity: Severity,
    ) -> Vec<RankedCandidate> {
        let Some(service_type) = issue_type.service_type() else {
            return Vec::new();
        };
        let zip = parse_zip(property_zip);
        let weights = UtilityWeights::for_severity(severity);

        let mut candidates: Vec<RankedCandidate> = self
            .catalog
            .by_service_type(service_type)
            .into_iter()
            .map(|vendor| RankedCandidate {
                vendor: vendor.clone(),
                zip_match: zip != 0 && vendor.zip == zip,
                utility: weights.score(vendor),
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates
    }

    pub fn rank(
        &self,
        issue_type: IssueType,
        property_zip: &str,
        severity: Severity,
    ) -> VendorSelection {
        let Some(service_type) = issue_type.service_type() else {
            return VendorSelection::NoMatch {
                service_type: None,
                explanation: format!(
                    "No matching service type found for issue type '{}'.",
                    issue_type.as_str()
                ),
            };
        };

        let candidates = self.ranked_candidates(issue_type, property_zip, severity);
        let Some(best) = candidates.first() else {
            tracing::debug!(
                event_name = "ranking.no_candidates",
                service_type = service_type.as_str(),
                "no vendors for service type"
            );
            return VendorSelection::NoMatch {
                service_type: Some(service_type),
                explanation: format!("No vendors available for {service_type} service."),
            };
        };

        let explanation = explain(best, property_zip);
        tracing::debug!(
            event_name = "ranking.selected",
            vendor_id = %best.vendor.vendor_id,
            utility = best.utility,
            zip_match = best.zip_match,
            "vendor selected"
        );
        VendorSelection::Matched(SelectedVendor::from_record(&best.vendor, explanation))
    }
}

fn compare_candidates(left: &RankedCandidate, right: &RankedCandidate) -> Ordering {
    right.zip_match.cmp(&left.zip_match).then_with(|| right.utility.total_cmp(&left.utility))
}

/// Non-numeric or missing zips become 0, which never matches.
fn parse_zip(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

fn explain(best: &RankedCandidate, property_zip: &str) -> String {
    let vendor = &best.vendor;
    let locality = if best.zip_match {
        "in your area".to_owned()
    } else {
        format!("near ZIP {property_zip}")
    };
    let speed = if vendor.speed_score >= 4 { "fast" } else { "standard" };
    let pricing = if vendor.price_band == 1 { "budget-friendly" } else { "competitive" };
    format!(
        "Selected {} for {} service {locality}. They have a {:.1}/5.0 rating, {speed} response time, and {pricing} pricing.",
        vendor.name, vendor.service_type, vendor.rating
    )
}
