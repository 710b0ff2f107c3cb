//! Privacy records/notification API seam.
//!
//! Stores talk to the server only through [`PrivacyApi`], so tests swap in a
//! mock and production uses [`HttpPrivacyApi`].

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use client::HttpPrivacyApi;
pub use types::*;

use async_trait::async_trait;

use crate::error::PrivacyError;
use crate::models::{ArcoRequestId, PatientId};

#[async_trait]
pub trait PrivacyApi: Send + Sync {
    /// `GET /privacy/consent-status/{patientId}`.
    /// 403 and 404 come back as `PrivacyError::NoConsentYet`.
    async fn consent_status(
        &self,
        patient_id: PatientId,
    ) -> Result<ConsentStatusResponse, PrivacyError>;

    /// `POST /privacy/send-whatsapp-notice`. Hands the notice to the
    /// notification gateway; delivery/read/response arrive later on fetch.
    async fn send_notice(
        &self,
        request: &SendNoticeRequest,
    ) -> Result<SendNoticeResponse, PrivacyError>;

    /// `POST /privacy/revoke`. Acknowledgment only.
    async fn revoke(&self, request: &RevokeRequest) -> Result<(), PrivacyError>;

    /// `GET /privacy/arco-requests/{patientId}`.
    async fn arco_requests(&self, patient_id: PatientId)
        -> Result<ArcoListResponse, PrivacyError>;

    /// `POST /privacy/arco-request`.
    async fn create_arco_request(
        &self,
        request: &CreateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError>;

    /// `PUT /privacy/arco-request/{id}`.
    async fn update_arco_request(
        &self,
        id: ArcoRequestId,
        request: &UpdateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError>;
}
