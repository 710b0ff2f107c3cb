//! Compliance orchestration over the consent and ARCO stores.
//!
//! Answers three questions for a patient on a given day: may a consultation
//! proceed, is a renewal warning due, and which ARCO requests are past their
//! statutory response deadline. `assess` bundles all of them.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::api::{HttpPrivacyApi, PrivacyApi};
use crate::arco_store::ArcoStore;
use crate::business_days::BusinessCalendar;
use crate::config::{ApiConfig, EngineConfig};
use crate::consent_store::ConsentStore;
use crate::error::PrivacyError;
use crate::expiration::{self, ExpirationStatus};
use crate::models::{ArcoRequest, ConsentSnapshot, PatientId};
use crate::presenter::{self, StatusLabel};

/// Why a consultation may not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    NoConsent,
    Revoked,
    Expired,
    NotAccepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConsultationGate {
    Allowed,
    Blocked { reason: BlockReason },
}

impl ConsultationGate {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    DueSoon,
    OnTrack,
}

/// An open ARCO request with its statutory dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArcoObligation {
    pub request: ArcoRequest,
    pub response_deadline: NaiveDate,
    pub execution_deadline: NaiveDate,
    /// Business days from today to the response deadline. Negative when late.
    pub business_days_left: i64,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceReport {
    pub patient_id: PatientId,
    pub today: NaiveDate,
    pub gate: ConsultationGate,
    pub consent_label: StatusLabel,
    pub expiration: ExpirationStatus,
    pub renewal_warning: Option<ExpirationStatus>,
    /// Open requests, most urgent first.
    pub obligations: Vec<ArcoObligation>,
}

impl ComplianceReport {
    pub fn escalations(&self) -> impl Iterator<Item = &ArcoRequest> {
        self.obligations
            .iter()
            .filter(|o| o.urgency == Urgency::Overdue)
            .map(|o| &o.request)
    }
}

// ═══════════════════════════════════════════════════════════
// Pure evaluation
// ═══════════════════════════════════════════════════════════

/// Gate decision for a consent snapshot.
pub fn gate_for(snapshot: &ConsentSnapshot, today: NaiveDate) -> ConsultationGate {
    let Some(record) = snapshot.record.as_ref() else {
        return ConsultationGate::Blocked {
            reason: BlockReason::NoConsent,
        };
    };
    let reason = if record.is_revoked {
        BlockReason::Revoked
    } else if !record.is_accepted() {
        BlockReason::NotAccepted
    } else if expiration::evaluate(Some(record), today).is_expired {
        BlockReason::Expired
    } else {
        return ConsultationGate::Allowed;
    };
    ConsultationGate::Blocked { reason }
}

/// Renewal warning for a snapshot, only when one is due.
pub fn renewal_warning_for(snapshot: &ConsentSnapshot, today: NaiveDate) -> Option<ExpirationStatus> {
    let status = expiration::evaluate(snapshot.record.as_ref(), today);
    status.is_expiring.then_some(status)
}

/// Open requests with deadlines and urgency, most urgent first.
pub fn obligations_for(
    requests: &[ArcoRequest],
    calendar: &BusinessCalendar,
    today: NaiveDate,
    due_soon_business_days: i64,
) -> Vec<ArcoObligation> {
    let mut obligations: Vec<_> = requests
        .iter()
        .filter(|r| r.status.is_open())
        .map(|r| {
            let response_deadline = r.response_deadline(calendar);
            let business_days_left = calendar.business_days_between(today, response_deadline);
            let urgency = if r.is_overdue(calendar, today) {
                Urgency::Overdue
            } else if business_days_left <= due_soon_business_days {
                Urgency::DueSoon
            } else {
                Urgency::OnTrack
            };
            ArcoObligation {
                request: r.clone(),
                response_deadline,
                execution_deadline: r.execution_deadline(calendar),
                business_days_left,
                urgency,
            }
        })
        .collect();
    obligations.sort_by_key(|o| (o.urgency, o.response_deadline));
    obligations
}

// ═══════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════

pub struct ComplianceOrchestrator {
    consent: Arc<ConsentStore>,
    arco: Arc<ArcoStore>,
    calendar: BusinessCalendar,
    config: EngineConfig,
}

impl ComplianceOrchestrator {
    pub fn new(api: Arc<dyn PrivacyApi>, config: EngineConfig) -> Self {
        Self {
            consent: Arc::new(ConsentStore::new(Arc::clone(&api), &config)),
            arco: Arc::new(ArcoStore::new(api, &config)),
            calendar: BusinessCalendar::new(),
            config,
        }
    }

    /// Orchestrator backed by the HTTP privacy API.
    pub fn connect(api_config: &ApiConfig, config: EngineConfig) -> Result<Self, PrivacyError> {
        let api = HttpPrivacyApi::new(api_config)?;
        tracing::info!(base_url = api.base_url(), "Compliance engine connected");
        Ok(Self::new(Arc::new(api), config))
    }

    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn consent(&self) -> &Arc<ConsentStore> {
        &self.consent
    }

    pub fn arco(&self) -> &Arc<ArcoStore> {
        &self.arco
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub async fn consultation_gate(
        &self,
        patient_id: PatientId,
        today: NaiveDate,
    ) -> Result<ConsultationGate, PrivacyError> {
        let snapshot = self.consent.fetch(patient_id).await?;
        let gate = gate_for(&snapshot, today);
        if let ConsultationGate::Blocked { reason } = gate {
            tracing::info!(patient_id, reason = ?reason, "Consultation blocked");
        }
        Ok(gate)
    }

    pub async fn renewal_warning(
        &self,
        patient_id: PatientId,
        today: NaiveDate,
    ) -> Result<Option<ExpirationStatus>, PrivacyError> {
        let snapshot = self.consent.fetch(patient_id).await?;
        Ok(renewal_warning_for(&snapshot, today))
    }

    /// Open requests past their response deadline.
    pub async fn arco_escalations(
        &self,
        patient_id: PatientId,
        today: NaiveDate,
    ) -> Result<Vec<ArcoRequest>, PrivacyError> {
        let requests = self.arco.requests(patient_id).await?;
        let overdue: Vec<_> = requests
            .into_iter()
            .filter(|r| r.is_overdue(&self.calendar, today))
            .collect();
        if !overdue.is_empty() {
            tracing::warn!(patient_id, count = overdue.len(), "ARCO requests past response deadline");
        }
        Ok(overdue)
    }

    /// Full compliance picture for one patient.
    pub async fn assess(
        &self,
        patient_id: PatientId,
        today: NaiveDate,
    ) -> Result<ComplianceReport, PrivacyError> {
        let (snapshot, requests) = tokio::join!(
            self.consent.fetch(patient_id),
            self.arco.requests(patient_id)
        );
        let snapshot = snapshot?;
        let requests = requests?;

        let obligations = obligations_for(
            &requests,
            &self.calendar,
            today,
            self.config.due_soon_business_days,
        );
        let report = ComplianceReport {
            patient_id,
            today,
            gate: gate_for(&snapshot, today),
            consent_label: presenter::present_with_revocation(snapshot.record.as_ref()),
            expiration: expiration::evaluate(snapshot.record.as_ref(), today),
            renewal_warning: renewal_warning_for(&snapshot, today),
            obligations,
        };
        tracing::debug!(
            patient_id,
            allowed = report.gate.is_allowed(),
            open_requests = report.obligations.len(),
            "Compliance assessed"
        );
        Ok(report)
    }

    /// Tear down both stores.
    pub fn close(&self) {
        self.consent.close();
        self.arco.close();
    }
}
