use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::enums::{ConsentMethod, ConsentStatus};
use super::PatientId;
use crate::api::types::RawConsentRecord;
use crate::error::PrivacyError;

/// Canonical consent boolean. Derived once at ingestion from the wire
/// `consentGiven` and never re-derived from the legacy status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentGiven {
    Yes,
    No,
    Unknown,
}

impl From<Option<bool>> for ConsentGiven {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unknown,
        }
    }
}

/// Single resolved view of a consent record. Revocation wins over
/// everything, then the canonical boolean, then the legacy status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CanonicalConsent {
    Revoked {
        revoked_date: Option<DateTime<Utc>>,
        reason: Option<String>,
    },
    Accepted {
        consent_date: Option<DateTime<Utc>>,
    },
    Declined,
    Undetermined {
        status: ConsentStatus,
    },
}

/// The active consent record of one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentRecord {
    pub id: Option<i64>,
    pub patient_id: PatientId,
    pub method: ConsentMethod,
    pub notice_version: Option<String>,
    /// Legacy status. Display fallback only; read `canonical` for decisions.
    pub status: ConsentStatus,
    pub consent_given: ConsentGiven,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub consent_date: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub revoked_date: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
    pub contact_phone_snapshot: Option<String>,
    pub canonical: CanonicalConsent,
}

impl ConsentRecord {
    /// Ingest a wire record: parse the legacy status, derive the canonical
    /// state and check that notice timestamps never go backwards.
    pub fn ingest(raw: RawConsentRecord) -> Result<Self, PrivacyError> {
        check_timeline(&raw)?;

        let status = raw
            .status
            .as_deref()
            .map(ConsentStatus::from_legacy)
            .unwrap_or(ConsentStatus::Unknown);

        let mut record = Self {
            id: raw.id,
            patient_id: raw.patient_id,
            method: raw.method.unwrap_or(ConsentMethod::MessagingButton),
            notice_version: raw.notice_version,
            status,
            consent_given: raw.consent_given.into(),
            sent_at: raw.sent_at,
            delivered_at: raw.delivered_at,
            read_at: raw.read_at,
            responded_at: raw.responded_at,
            consent_date: raw.consent_date,
            is_revoked: raw.is_revoked.unwrap_or(false),
            revoked_date: raw.revoked_date,
            revocation_reason: raw.revocation_reason,
            contact_phone_snapshot: raw.contact_phone_snapshot,
            canonical: CanonicalConsent::Declined,
        };
        record.canonical = record.resolve_canonical();
        Ok(record)
    }

    fn resolve_canonical(&self) -> CanonicalConsent {
        if self.is_revoked {
            return CanonicalConsent::Revoked {
                revoked_date: self.revoked_date,
                reason: self.revocation_reason.clone(),
            };
        }
        match self.consent_given {
            ConsentGiven::Yes => CanonicalConsent::Accepted {
                consent_date: self.consent_date,
            },
            ConsentGiven::No => CanonicalConsent::Declined,
            ConsentGiven::Unknown => CanonicalConsent::Undetermined {
                status: self.status,
            },
        }
    }

    /// Calendar day the consent was given, if any.
    pub fn consent_day(&self) -> Option<NaiveDate> {
        self.consent_date.map(|d| d.date_naive())
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.canonical, CanonicalConsent::Accepted { .. })
    }

    /// Ingest the record echoed by the send-notice endpoint and start the new
    /// cycle on it. `previous` is the locally known status before the send.
    ///
    /// The echo may still carry the previous cycle's delivery progress, which
    /// predates the new `sentAt`; it is dropped before the ordering check.
    pub fn ingest_notice_echo(
        mut raw: RawConsentRecord,
        previous: Option<ConsentStatus>,
        sent_fallback: DateTime<Utc>,
        phone: &str,
    ) -> Result<Self, PrivacyError> {
        raw.delivered_at = None;
        raw.read_at = None;
        raw.responded_at = None;
        let sent_at = raw.sent_at.unwrap_or(sent_fallback);

        let mut record = Self::ingest(raw)?;
        let previous = previous.unwrap_or(record.status);
        record.restart_notice_cycle(previous, sent_at, phone);
        Ok(record)
    }

    /// Start a new notice cycle on this record (resend).
    ///
    /// `previous` is the status the record had before the resend. A cycle that
    /// ended rejected or expired also loses its consent anchor. A consent that
    /// is still given stays `Accepted` while the renewal notice is out.
    pub fn restart_notice_cycle(
        &mut self,
        previous: ConsentStatus,
        sent_at: DateTime<Utc>,
        phone: &str,
    ) {
        self.sent_at = Some(sent_at);
        self.delivered_at = None;
        self.read_at = None;
        self.responded_at = None;
        if previous.ends_cycle_without_consent() {
            self.consent_given = ConsentGiven::Unknown;
            self.consent_date = None;
        }
        self.status = if self.consent_given == ConsentGiven::Yes {
            ConsentStatus::Accepted
        } else {
            ConsentStatus::Sent
        };
        self.contact_phone_snapshot = Some(phone.to_string());
        self.canonical = self.resolve_canonical();
    }

    /// Mark the record revoked. Historical timestamps are kept.
    pub fn apply_revocation(&mut self, revoked_at: DateTime<Utc>, reason: &str) {
        self.is_revoked = true;
        self.revoked_date = Some(revoked_at);
        self.revocation_reason = Some(reason.to_string());
        self.status = ConsentStatus::Revoked;
        self.consent_given = ConsentGiven::No;
        self.canonical = self.resolve_canonical();
    }

    /// Record created locally for a first notice when the server answered
    /// with a bare acknowledgment.
    pub fn first_notice(patient_id: PatientId, sent_at: DateTime<Utc>, phone: &str) -> Self {
        let mut record = Self {
            id: None,
            patient_id,
            method: ConsentMethod::MessagingButton,
            notice_version: None,
            status: ConsentStatus::Sent,
            consent_given: ConsentGiven::Unknown,
            sent_at: Some(sent_at),
            delivered_at: None,
            read_at: None,
            responded_at: None,
            consent_date: None,
            is_revoked: false,
            revoked_date: None,
            revocation_reason: None,
            contact_phone_snapshot: Some(phone.to_string()),
            canonical: CanonicalConsent::Declined,
        };
        record.canonical = record.resolve_canonical();
        record
    }
}

fn check_timeline(raw: &RawConsentRecord) -> Result<(), PrivacyError> {
    let steps = [
        ("sentAt", raw.sent_at),
        ("deliveredAt", raw.delivered_at),
        ("readAt", raw.read_at),
        ("respondedAt", raw.responded_at),
    ];
    let mut last: Option<(&str, DateTime<Utc>)> = None;
    for (name, value) in steps {
        let Some(at) = value else { continue };
        if let Some((prev_name, prev_at)) = last {
            if at < prev_at {
                return Err(PrivacyError::InvalidRecord(format!(
                    "{name} ({at}) is earlier than {prev_name} ({prev_at})"
                )));
            }
        }
        last = Some((name, at));
    }
    Ok(())
}

/// Result of a consent-status fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentSnapshot {
    pub has_consent: bool,
    pub record: Option<ConsentRecord>,
}

impl ConsentSnapshot {
    pub fn none() -> Self {
        Self {
            has_consent: false,
            record: None,
        }
    }
}
