//! Wire types for the privacy endpoints (camelCase JSON).
//!
//! Consent records arrive as `RawConsentRecord` and are only used after
//! ingestion into `models::ConsentRecord`. ARCO requests have no legacy fields
//! and deserialize straight into the domain type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ArcoRequest, ArcoRequestType, ArcoStatus, ConsentMethod, PatientId};

/// Consent record exactly as the server sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConsentRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub patient_id: PatientId,
    #[serde(default)]
    pub method: Option<ConsentMethod>,
    #[serde(default)]
    pub notice_version: Option<String>,
    /// Legacy status string. Kept loose so unknown values don't fail decoding.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub consent_given: Option<bool>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consent_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_revoked: Option<bool>,
    #[serde(default)]
    pub revoked_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revocation_reason: Option<String>,
    #[serde(default)]
    pub contact_phone_snapshot: Option<String>,
}

/// `GET /privacy/consent-status/{patientId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatusResponse {
    pub has_consent: bool,
    #[serde(default)]
    pub consent: Option<RawConsentRecord>,
}

/// `POST /privacy/send-whatsapp-notice`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNoticeRequest {
    pub patient_id: PatientId,
    pub method: ConsentMethod,
}

/// Some deployments answer with a bare acknowledgment and no record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendNoticeResponse {
    #[serde(default)]
    pub consent: Option<RawConsentRecord>,
}

/// `POST /privacy/revoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub patient_id: PatientId,
    pub revocation_reason: String,
}

/// `GET /privacy/arco-requests/{patientId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcoListResponse {
    #[serde(default)]
    pub arco_requests: Vec<ArcoRequest>,
}

/// `POST /privacy/arco-request`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArcoRequest {
    pub patient_id: PatientId,
    pub request_type: ArcoRequestType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

/// `PUT /privacy/arco-request/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArcoRequest {
    pub status: ArcoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

/// Response body of both ARCO mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcoResponse {
    pub arco_request: ArcoRequest,
}
