use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::booking::{Booking, JobId, JobUpdate};
use crate::domain::incident::{IncidentId, Severity};
use crate::domain::quote::{AvailabilitySlot, Quote, QuoteId, SlotId};
use crate::domain::vendor::{ServiceType, VendorId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub vendor_id: VendorId,
    pub service_type: ServiceType,
    pub issue_description: String,
    pub property_zip: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub vendor_id: VendorId,
    pub service_type: ServiceType,
    pub quote_id: QuoteId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub vendor_id: VendorId,
    pub quote_id: QuoteId,
    pub slot_id: SlotId,
    pub tenant_name: String,
    pub tenant_phone: String,
    #[serde(default)]
    pub special_instructions: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRequest {
    pub incident_id: IncidentId,
    pub vendor_id: VendorId,
    pub job_id: JobId,
    pub quote_id: QuoteId,
    pub quoted_total: Decimal,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VendorServiceError {
    #[error("vendor service transport failure: {0}")]
    Transport(String),
    #[error("vendor service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("vendor service response could not be decoded: {message}")]
    Decode { message: String, raw: String },
    #[error("vendor rejected the request: {0}")]
    Rejected(String),
}

impl VendorServiceError {
    /// Raw upstream text worth keeping in diagnostics.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Decode { raw, .. } => Some(raw),
            Self::Status { body, .. } => Some(body),
            Self::Transport(_) | Self::Rejected(_) => None,
        }
    }
}

/// Remote vendor desk: quoting, scheduling, booking and job tracking.
#[async_trait]
pub trait VendorServiceClient: Send + Sync {
    async fn request_quote(&self, request: &QuoteRequest) -> Result<Quote, VendorServiceError>;

    /// Open slots, earliest first.
    async fn get_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Vec<AvailabilitySlot>, VendorServiceError>;

    async fn book_slot(&self, request: &BookingRequest) -> Result<Booking, VendorServiceError>;

    async fn job_status(&self, request: &JobStatusRequest)
        -> Result<JobUpdate, VendorServiceError>;
}
