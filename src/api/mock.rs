//! In-memory `PrivacyApi` for store and orchestrator tests.
//!
//! Every endpoint returns a configurable result and counts its calls.
//! `hold_consent_status` parks consent-status calls until `release` so tests
//! can observe in-flight behaviour.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::types::*;
use super::PrivacyApi;
use crate::error::PrivacyError;
use crate::models::{ArcoRequestId, PatientId};

pub struct MockPrivacyApi {
    consent: Mutex<Result<ConsentStatusResponse, PrivacyError>>,
    send_notice: Mutex<Result<SendNoticeResponse, PrivacyError>>,
    revoke: Mutex<Result<(), PrivacyError>>,
    arco_list: Mutex<Result<ArcoListResponse, PrivacyError>>,
    arco_create: Mutex<Result<ArcoResponse, PrivacyError>>,
    arco_update: Mutex<Result<ArcoResponse, PrivacyError>>,
    delay: Duration,
    held: Mutex<bool>,
    release: Notify,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_revoke: Mutex<Option<RevokeRequest>>,
    last_create: Mutex<Option<CreateArcoRequest>>,
}

impl MockPrivacyApi {
    pub fn new() -> Self {
        let unset = || PrivacyError::Server { status: 500 };
        Self {
            consent: Mutex::new(Err(PrivacyError::NoConsentYet)),
            send_notice: Mutex::new(Err(unset())),
            revoke: Mutex::new(Ok(())),
            arco_list: Mutex::new(Ok(ArcoListResponse {
                arco_requests: Vec::new(),
            })),
            arco_create: Mutex::new(Err(unset())),
            arco_update: Mutex::new(Err(unset())),
            delay: Duration::ZERO,
            held: Mutex::new(false),
            release: Notify::new(),
            calls: Mutex::new(HashMap::new()),
            last_revoke: Mutex::new(None),
            last_create: Mutex::new(None),
        }
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_consent(&self, result: Result<ConsentStatusResponse, PrivacyError>) {
        *self.consent.lock().unwrap() = result;
    }

    pub fn set_consent_record(&self, record: RawConsentRecord) {
        self.set_consent(Ok(ConsentStatusResponse {
            has_consent: record.consent_given == Some(true),
            consent: Some(record),
        }));
    }

    pub fn set_send_notice(&self, result: Result<SendNoticeResponse, PrivacyError>) {
        *self.send_notice.lock().unwrap() = result;
    }

    pub fn set_revoke(&self, result: Result<(), PrivacyError>) {
        *self.revoke.lock().unwrap() = result;
    }

    pub fn set_arco_list(&self, result: Result<ArcoListResponse, PrivacyError>) {
        *self.arco_list.lock().unwrap() = result;
    }

    pub fn set_arco_create(&self, result: Result<ArcoResponse, PrivacyError>) {
        *self.arco_create.lock().unwrap() = result;
    }

    pub fn set_arco_update(&self, result: Result<ArcoResponse, PrivacyError>) {
        *self.arco_update.lock().unwrap() = result;
    }

    /// Park consent-status calls until [`release`](Self::release).
    pub fn hold_consent_status(&self) {
        *self.held.lock().unwrap() = true;
    }

    pub fn release(&self) {
        *self.held.lock().unwrap() = false;
        self.release.notify_waiters();
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn last_revoke(&self) -> Option<RevokeRequest> {
        self.last_revoke.lock().unwrap().clone()
    }

    pub fn last_create(&self) -> Option<CreateArcoRequest> {
        self.last_create.lock().unwrap().clone()
    }

    async fn record(&self, endpoint: &'static str) {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl PrivacyApi for MockPrivacyApi {
    async fn consent_status(
        &self,
        _patient_id: PatientId,
    ) -> Result<ConsentStatusResponse, PrivacyError> {
        self.record("consent_status").await;
        loop {
            let notified = self.release.notified();
            let held = *self.held.lock().unwrap();
            if !held {
                break;
            }
            notified.await;
        }
        self.consent.lock().unwrap().clone()
    }

    async fn send_notice(
        &self,
        _request: &SendNoticeRequest,
    ) -> Result<SendNoticeResponse, PrivacyError> {
        self.record("send_notice").await;
        self.send_notice.lock().unwrap().clone()
    }

    async fn revoke(&self, request: &RevokeRequest) -> Result<(), PrivacyError> {
        self.record("revoke").await;
        *self.last_revoke.lock().unwrap() = Some(request.clone());
        self.revoke.lock().unwrap().clone()
    }

    async fn arco_requests(
        &self,
        _patient_id: PatientId,
    ) -> Result<ArcoListResponse, PrivacyError> {
        self.record("arco_requests").await;
        self.arco_list.lock().unwrap().clone()
    }

    async fn create_arco_request(
        &self,
        request: &CreateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError> {
        self.record("create_arco_request").await;
        *self.last_create.lock().unwrap() = Some(request.clone());
        self.arco_create.lock().unwrap().clone()
    }

    async fn update_arco_request(
        &self,
        _id: ArcoRequestId,
        _request: &UpdateArcoRequest,
    ) -> Result<ArcoResponse, PrivacyError> {
        self.record("update_arco_request").await;
        self.arco_update.lock().unwrap().clone()
    }
}
