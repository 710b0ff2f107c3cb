//! ARCO request workflow: per-patient list, creation and status updates.
//!
//! The list is most-recent-first. Lists are replaced wholesale on fetch and
//! kept for the store's cache TTL, so server-side status changes show up on
//! the next fetch after that. Mutations land locally only after the server
//! returned the stored request, and only on a list that was fetched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::api::{CreateArcoRequest, PrivacyApi, UpdateArcoRequest};
use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::error::{PrivacyError, ValidationError};
use crate::lock;
use crate::models::{ArcoDraft, ArcoRequest, ArcoRequestId, ArcoStatus, PatientContact, PatientId};
use crate::single_flight::SingleFlight;

type ListResult = Result<Vec<ArcoRequest>, PrivacyError>;

pub struct ArcoStore {
    api: Arc<dyn PrivacyApi>,
    lists: Mutex<TtlCache<PatientId, Vec<ArcoRequest>>>,
    flights: SingleFlight<PatientId, ListResult>,
    closed: AtomicBool,
}

impl ArcoStore {
    pub fn new(api: Arc<dyn PrivacyApi>, config: &EngineConfig) -> Self {
        Self {
            api,
            lists: Mutex::new(TtlCache::new(config.cache_ttl)),
            flights: SingleFlight::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Fetch the patient's requests and replace the local list.
    pub async fn list(&self, patient_id: PatientId) -> ListResult {
        self.ensure_open()?;

        let api = Arc::clone(&self.api);
        let result = self
            .flights
            .run(patient_id, move || async move {
                api.arco_requests(patient_id)
                    .await
                    .map(|response| response.arco_requests)
            })
            .await;

        if self.is_closed() {
            tracing::debug!(patient_id, "Discarding ARCO list that finished after close");
            return Err(PrivacyError::Closed);
        }

        match &result {
            Ok(requests) => {
                tracing::debug!(patient_id, count = requests.len(), "ARCO requests loaded");
                lock(&self.lists).set(patient_id, requests.clone());
            }
            Err(e) => tracing::warn!(patient_id, error = %e, "ARCO list fetch failed"),
        }
        result
    }

    /// Last fetched (and since mutated) list while still fresh. No I/O.
    pub fn cached(&self, patient_id: PatientId) -> Option<Vec<ArcoRequest>> {
        lock(&self.lists).get(&patient_id)
    }

    /// Forget the patient's list so the next read fetches it.
    pub fn invalidate(&self, patient_id: PatientId) {
        lock(&self.lists).invalidate(&patient_id);
    }

    /// Fresh cached list, or a fetch.
    pub async fn requests(&self, patient_id: PatientId) -> ListResult {
        match self.cached(patient_id) {
            Some(requests) => Ok(requests),
            None => self.list(patient_id).await,
        }
    }

    /// File a new ARCO request. Blank contact fields default from `contact`.
    pub async fn create(
        &self,
        patient_id: PatientId,
        draft: ArcoDraft,
        contact: Option<&PatientContact>,
    ) -> Result<ArcoRequest, PrivacyError> {
        let description = draft.description.trim().to_string();
        if description.is_empty() {
            return Err(ValidationError::MissingDescription.into());
        }
        self.ensure_open()?;

        let draft = match contact {
            Some(contact) => draft.with_contact_defaults(contact),
            None => draft,
        };
        let body = CreateArcoRequest {
            patient_id,
            request_type: draft.request_type,
            description,
            contact_email: non_blank(draft.contact_email),
            contact_phone: non_blank(draft.contact_phone),
        };
        let created = self.api.create_arco_request(&body).await?.arco_request;

        if self.is_closed() {
            return Err(PrivacyError::Closed);
        }
        // Only a fetched list is extended
        if let Some(list) = lock(&self.lists).get_mut(&patient_id) {
            list.insert(0, created.clone());
        }

        tracing::info!(
            patient_id,
            request_id = created.id,
            request_type = %created.request_type,
            "ARCO request created"
        );
        Ok(created)
    }

    /// Move a request to `status`. Requests present in the local list must
    /// follow the forward-only lifecycle; unknown ids are left to the server.
    pub async fn update_status(
        &self,
        patient_id: PatientId,
        id: ArcoRequestId,
        status: ArcoStatus,
        notes: Option<&str>,
    ) -> Result<ArcoRequest, PrivacyError> {
        self.ensure_open()?;

        if let Some(from) = self.local_status(patient_id, id) {
            if !from.can_transition_to(status) {
                return Err(ValidationError::InvalidTransition { from, to: status }.into());
            }
        }

        let body = UpdateArcoRequest {
            status,
            resolution_notes: non_blank(notes.map(str::to_string)),
        };
        let updated = self.api.update_arco_request(id, &body).await?.arco_request;

        if self.is_closed() {
            return Err(PrivacyError::Closed);
        }
        if let Some(list) = lock(&self.lists).get_mut(&patient_id) {
            match list.iter_mut().find(|r| r.id == updated.id) {
                Some(slot) => *slot = updated.clone(),
                None => tracing::debug!(patient_id, request_id = id, "Updated request not in local list"),
            }
        }

        tracing::info!(patient_id, request_id = id, status = %updated.status, "ARCO request updated");
        Ok(updated)
    }

    fn local_status(&self, patient_id: PatientId, id: ArcoRequestId) -> Option<ArcoStatus> {
        lock(&self.lists)
            .get_mut(&patient_id)?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    /// Tear down. Results landing afterwards are discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.lists).clear();
        tracing::info!("ARCO store closed");
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

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
