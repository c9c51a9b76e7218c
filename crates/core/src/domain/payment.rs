use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::incident::IncidentId;
use crate::domain::vendor::VendorId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MandateId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MandateStatus {
    Authorized,
    Redeemed,
    Declined,
}

/// Budget authorization scoped to one incident and one payee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandate {
    pub mandate_id: MandateId,
    pub subject: IncidentId,
    pub payee: VendorId,
    pub currency: String,
    pub max_amount: Decimal,
    pub valid_until: DateTime<Utc>,
    pub status: MandateStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Settled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub mandate_id: MandateId,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub settled_at: DateTime<Utc>,
}
