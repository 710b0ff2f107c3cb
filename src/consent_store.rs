//! Consent record store: one canonical `ConsentRecord` per patient.
//!
//! - `fetch` is single-flight per patient and served from the TTL cache when
//!   fresh. 403/404 mean "no consent yet", not an error.
//! - Mutations (`send_notice`, `revoke`) touch local state only after the
//!   server acknowledged them. On failure nothing local changes.
//! - `close` stops polling and makes results that land afterwards void.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use crate::api::{PrivacyApi, RevokeRequest, SendNoticeRequest};
use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::error::{PrivacyError, ValidationError};
use crate::lock;
use crate::models::{ConsentMethod, ConsentRecord, ConsentSnapshot, PatientId};
use crate::polling::{spawn_polling, PollCanceller, PollControl, PollHandle};
use crate::single_flight::SingleFlight;

type FetchResult = Result<ConsentSnapshot, PrivacyError>;

pub struct ConsentStore {
    api: Arc<dyn PrivacyApi>,
    cache: Mutex<TtlCache<PatientId, ConsentSnapshot>>,
    flights: SingleFlight<PatientId, FetchResult>,
    /// Last unexpected failure per patient. Cleared by the next good fetch.
    errors: Mutex<HashMap<PatientId, PrivacyError>>,
    polls: Mutex<Vec<PollCanceller>>,
    poll_interval: Duration,
    closed: AtomicBool,
}

impl ConsentStore {
    pub fn new(api: Arc<dyn PrivacyApi>, config: &EngineConfig) -> Self {
        Self {
            api,
            cache: Mutex::new(TtlCache::new(config.cache_ttl)),
            flights: SingleFlight::new(),
            errors: Mutex::new(HashMap::new()),
            polls: Mutex::new(Vec::new()),
            poll_interval: config.poll_interval,
            closed: AtomicBool::new(false),
        }
    }

    // ── Reads ───────────────────────────────────────────────

    /// Consent snapshot for a patient, from cache when fresh.
    pub async fn fetch(&self, patient_id: PatientId) -> FetchResult {
        self.ensure_open()?;
        let cached = lock(&self.cache).get(&patient_id);
        if let Some(hit) = cached {
            tracing::debug!(patient_id, "Consent cache hit");
            return Ok(hit);
        }
        self.refresh(patient_id).await
    }

    /// Fetch from the server, ignoring the cache. Still single-flight.
    pub async fn refresh(&self, patient_id: PatientId) -> FetchResult {
        self.ensure_open()?;

        let api = Arc::clone(&self.api);
        let result = self
            .flights
            .run(patient_id, move || load_snapshot(api, patient_id))
            .await;

        if self.is_closed() {
            tracing::debug!(patient_id, "Discarding consent fetch that finished after close");
            return Err(PrivacyError::Closed);
        }

        match &result {
            Ok(snapshot) => {
                let previous = lock(&self.cache).get(&patient_id);
                log_transition(patient_id, previous.as_ref(), snapshot);
                lock(&self.cache).set(patient_id, snapshot.clone());
                lock(&self.errors).remove(&patient_id);
            }
            Err(e) => {
                tracing::warn!(patient_id, error = %e, "Consent status fetch failed");
                lock(&self.errors).insert(patient_id, e.clone());
            }
        }
        result
    }

    /// Cached snapshot if still fresh. Never touches the network.
    pub fn current(&self, patient_id: PatientId) -> Option<ConsentSnapshot> {
        lock(&self.cache).get(&patient_id)
    }

    pub fn last_error(&self, patient_id: PatientId) -> Option<PrivacyError> {
        lock(&self.errors).get(&patient_id).cloned()
    }

    /// Drop every stale snapshot. Runs on each poll tick.
    pub fn purge_expired(&self) -> usize {
        let purged = lock(&self.cache).purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Stale consent snapshots dropped");
        }
        purged
    }

    /// Drop the cached snapshot so the next `fetch` goes to the server.
    pub fn invalidate(&self, patient_id: PatientId) {
        lock(&self.cache).invalidate(&patient_id);
    }

    // ── Mutations ───────────────────────────────────────────

    /// Send (or resend) the privacy notice over the messaging channel.
    pub async fn send_notice(
        &self,
        patient_id: PatientId,
        phone: &str,
    ) -> Result<ConsentRecord, PrivacyError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ValidationError::MissingPhone.into());
        }
        self.ensure_open()?;

        let previous = self.current(patient_id).and_then(|s| s.record);
        let request = SendNoticeRequest {
            patient_id,
            method: ConsentMethod::MessagingButton,
        };
        let response = self.api.send_notice(&request).await?;

        let now = Utc::now();
        let resend = previous.is_some();
        let prior_status = previous.as_ref().map(|r| r.status);
        let record = match (response.consent, previous) {
            (Some(raw), _) => ConsentRecord::ingest_notice_echo(raw, prior_status, now, phone)?,
            (None, Some(mut record)) => {
                record.restart_notice_cycle(record.status, now, phone);
                record
            }
            (None, None) => ConsentRecord::first_notice(patient_id, now, phone),
        };

        if self.is_closed() {
            return Err(PrivacyError::Closed);
        }
        self.store_record(patient_id, record.clone());

        tracing::info!(
            patient_id,
            resend,
            prior_status = ?prior_status,
            "Privacy notice sent"
        );
        Ok(record)
    }

    /// Revoke an accepted consent.
    pub async fn revoke(
        &self,
        patient_id: PatientId,
        reason: &str,
    ) -> Result<ConsentRecord, PrivacyError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingReason.into());
        }
        self.ensure_open()?;

        let current = match self.current(patient_id) {
            Some(snapshot) => snapshot.record,
            None => self.fetch(patient_id).await?.record,
        };
        let Some(mut record) = current.filter(ConsentRecord::is_accepted) else {
            return Err(ValidationError::NotRevocable.into());
        };

        let request = RevokeRequest {
            patient_id,
            revocation_reason: reason.to_string(),
        };
        self.api.revoke(&request).await?;

        record.apply_revocation(Utc::now(), reason);
        if self.is_closed() {
            return Err(PrivacyError::Closed);
        }
        self.store_record(patient_id, record.clone());

        tracing::info!(patient_id, "Consent revoked");
        Ok(record)
    }

    fn store_record(&self, patient_id: PatientId, record: ConsentRecord) {
        let snapshot = ConsentSnapshot {
            has_consent: record.is_accepted(),
            record: Some(record),
        };
        lock(&self.cache).set(patient_id, snapshot);
        lock(&self.errors).remove(&patient_id);
    }

    // ── Polling & teardown ──────────────────────────────────

    /// Re-fetch the patient's consent every `interval` (store default when
    /// `None`) to pick up delivery, read and response events.
    pub fn start_polling(
        self: &Arc<Self>,
        patient_id: PatientId,
        interval: Option<Duration>,
    ) -> Result<PollHandle, PrivacyError> {
        self.ensure_open()?;
        let interval = interval.unwrap_or(self.poll_interval);
        let store = Arc::downgrade(self);

        let handle = spawn_polling(interval, move || {
            let store = store.clone();
            async move {
                let Some(store) = store.upgrade() else {
                    return PollControl::Stop;
                };
                store.purge_expired();
                match store.refresh(patient_id).await {
                    Ok(_) => PollControl::Continue,
                    Err(PrivacyError::Closed) => PollControl::Stop,
                    // Failure already logged and recorded by refresh
                    Err(_) => PollControl::Continue,
                }
            }
        });

        let mut polls = lock(&self.polls);
        polls.retain(|p| !p.is_cancelled());
        polls.push(handle.canceller());
        tracing::debug!(patient_id, ?interval, "Consent polling started");
        Ok(handle)
    }

    /// Tear down: stop all polling, forget cached state and void anything
    /// still in flight. Safe to call more than once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for poll in lock(&self.polls).drain(..) {
            poll.cancel();
        }
        lock(&self.cache).clear();
        lock(&self.errors).clear();
        tracing::info!("Consent store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), PrivacyError> {
        if self.is_closed() {
            Err(PrivacyError::Closed)
        } else {
            Ok(())
        }
    }
}

async fn load_snapshot(api: Arc<dyn PrivacyApi>, patient_id: PatientId) -> FetchResult {
    match api.consent_status(patient_id).await {
        Ok(response) => {
            let record = response.consent.map(ConsentRecord::ingest).transpose()?;
            Ok(ConsentSnapshot {
                has_consent: response.has_consent,
                record,
            })
        }
        Err(PrivacyError::NoConsentYet) => {
            tracing::debug!(patient_id, "No consent on record");
            Ok(ConsentSnapshot::none())
        }
        Err(e) => Err(e),
    }
}

fn log_transition(patient_id: PatientId, previous: Option<&ConsentSnapshot>, next: &ConsentSnapshot) {
    let before = previous.and_then(|s| s.record.as_ref()).map(|r| r.status);
    let after = next.record.as_ref().map(|r| r.status);
    if before.is_some() && before != after {
        tracing::info!(
            patient_id,
            from = ?before,
            to = ?after,
            "Consent status changed"
        );
    }
}
