use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vendor::ServiceType;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub labor: Decimal,
    pub parts: Decimal,
    pub travel: Decimal,
    pub total: Decimal,
}

impl CostEstimate {
    /// Splits a total 60/30/10 across labor, parts and travel.
    pub fn from_total(total: Decimal) -> Self {
        let total = total.max(Decimal::ZERO).round_dp(2);
        Self {
            labor: (total * Decimal::new(6, 1)).round_dp(2),
            parts: (total * Decimal::new(3, 1)).round_dp(2),
            travel: (total * Decimal::new(1, 1)).round_dp(2),
            total,
        }
    }

    pub fn is_non_negative(&self) -> bool {
        [self.labor, self.parts, self.travel, self.total]
            .iter()
            .all(|amount| *amount >= Decimal::ZERO)
    }

    /// Components may drift from the total by per-line rounding, never more.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_non_negative() {
            return Err(format!(
                "cost estimate has a negative figure (labor {}, parts {}, travel {}, total {})",
                self.labor, self.parts, self.travel, self.total
            ));
        }
        let components = self.labor + self.parts + self.travel;
        if (components - self.total).abs() > Decimal::new(2, 2) {
            return Err(format!(
                "cost components sum to {components} but the total is {}",
                self.total
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: QuoteId,
    pub service_type: ServiceType,
    pub estimate: CostEstimate,
    pub valid_until: DateTime<Utc>,
    pub conditions: Vec<String>,
    pub response_time: String,
}

impl Quote {
    pub fn total(&self) -> Decimal {
        self.estimate.total
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub slot_id: SlotId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl AvailabilitySlot {
    pub fn window_label(&self) -> (String, String, String) {
        (
            self.date.format("%Y-%m-%d").to_string(),
            self.start.format("%H:%M").to_string(),
            self.end.format("%H:%M").to_string(),
        )
    }
}
