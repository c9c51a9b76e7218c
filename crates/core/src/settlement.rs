//! Mandate-gated payment settlement.
//!
//! A payment only settles when the tenant confirmed the work, the vendor
//! reported `DONE`, and the final amount is non-negative and fits inside the
//! mandate. Every failed gate is reported, in a fixed order.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{JobStatus, JobUpdate};
use crate::domain::incident::IncidentRecord;
use crate::domain::payment::{
    Mandate, MandateId, MandateStatus, Payment, PaymentId, PaymentStatus,
};
use crate::domain::vendor::SelectedVendor;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPolicy {
    pub currency: String,
    pub default_max_amount: Decimal,
    pub mandate_validity_days: i64,
}

pub const DEFAULT_MANDATE_VALIDITY_DAYS: i64 = 30;

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            currency: "USD".to_owned(),
            default_max_amount: Decimal::new(500, 0),
            mandate_validity_days: DEFAULT_MANDATE_VALIDITY_DAYS,
        }
    }
}

impl SettlementPolicy {
    /// Mandate expiry. Out-of-range validity falls back to the default window.
    pub fn mandate_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(self.mandate_validity_days)
            .and_then(|validity| now.checked_add_signed(validity))
            .unwrap_or_else(|| now + Duration::days(DEFAULT_MANDATE_VALIDITY_DAYS))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    TenantNotConfirmed,
    JobStatus { status: JobStatus },
    AmountExceedsMandate { amount: Decimal, max_amount: Decimal },
    NegativeAmount { amount: Decimal },
}

impl RejectionReason {
    pub fn code(&self) -> String {
        match self {
            Self::TenantNotConfirmed => "tenant_not_confirmed".to_owned(),
            Self::JobStatus { status } => format!("job_status_{}", status.as_str()),
            Self::AmountExceedsMandate { .. } => "amount_exceeds_mandate".to_owned(),
            Self::NegativeAmount { .. } => "amount_negative".to_owned(),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub mandate: Mandate,
    pub paid: bool,
    pub payment: Option<Payment>,
    pub reasons: Vec<RejectionReason>,
}

impl SettlementOutcome {
    pub fn reason_codes(&self) -> Vec<String> {
        self.reasons.iter().map(RejectionReason::code).collect()
    }

    pub fn landlord_message(&self, vendor_name: &str) -> String {
        match &self.payment {
            Some(payment) => {
                format!("Payment of ${:.2} has been processed to vendor {vendor_name}.", payment.amount)
            }
            None => format!(
                "Payment was NOT processed automatically due to: [{}].",
                self.reason_codes().join(", ")
            ),
        }
    }
}

/// Settles payment for a completed job.
///
/// `tenant_confirmed` is an explicit confirmation signal when one exists;
/// `None` derives confirmation from the job status.
pub fn settle_payment(
    incident: &IncidentRecord,
    vendor: &SelectedVendor,
    job: &JobUpdate,
    tenant_confirmed: Option<bool>,
    policy: &SettlementPolicy,
) -> SettlementOutcome {
    settle_payment_at(incident, vendor, job, tenant_confirmed, policy, Utc::now())
}

pub fn settle_payment_at(
    incident: &IncidentRecord,
    vendor: &SelectedVendor,
    job: &JobUpdate,
    tenant_confirmed: Option<bool>,
    policy: &SettlementPolicy,
    now: DateTime<Utc>,
) -> SettlementOutcome {
    let scenario = &incident.scenario_id;
    let max_amount = incident.max_budget().unwrap_or(policy.default_max_amount);
    let mut mandate = Mandate {
        mandate_id: MandateId(format!("MANDATE-{scenario}-{}", vendor.vendor_id)),
        subject: scenario.clone(),
        payee: vendor.vendor_id.clone(),
        currency: policy.currency.clone(),
        max_amount,
        valid_until: policy.mandate_expiry(now),
        status: MandateStatus::Authorized,
    };

    let confirmed = tenant_confirmed.unwrap_or(job.status.is_completion());
    let mut reasons = Vec::new();
    if !confirmed {
        reasons.push(RejectionReason::TenantNotConfirmed);
    }
    if !job.status.is_completion() {
        reasons.push(RejectionReason::JobStatus { status: job.status });
    }
    if job.final_amount > max_amount {
        reasons.push(RejectionReason::AmountExceedsMandate { amount: job.final_amount, max_amount });
    }
    if job.final_amount < Decimal::ZERO {
        reasons.push(RejectionReason::NegativeAmount { amount: job.final_amount });
    }

    if !reasons.is_empty() {
        mandate.status = MandateStatus::Declined;
        tracing::info!(
            event_name = "settlement.rejected",
            incident_id = %scenario,
            vendor_id = %vendor.vendor_id,
            reasons = ?reasons.iter().map(RejectionReason::code).collect::<Vec<_>>(),
            "payment not settled"
        );
        return SettlementOutcome { mandate, paid: false, payment: None, reasons };
    }

    mandate.status = MandateStatus::Redeemed;
    let payment = Payment {
        payment_id: PaymentId(format!("PAY-{scenario}-{}", vendor.vendor_id)),
        mandate_id: mandate.mandate_id.clone(),
        amount: job.final_amount,
        currency: mandate.currency.clone(),
        status: PaymentStatus::Settled,
        settled_at: now,
    };
    tracing::info!(
        event_name = "settlement.settled",
        incident_id = %scenario,
        vendor_id = %vendor.vendor_id,
        amount = %payment.amount,
        "payment settled"
    );
    SettlementOutcome { mandate, paid: true, payment: Some(payment), reasons }
}
