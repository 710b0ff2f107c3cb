use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ArcoRequestType, ArcoStatus};
use super::PatientId;
use crate::business_days::BusinessCalendar;
use crate::config::{ARCO_EXECUTION_BUSINESS_DAYS, ARCO_RESPONSE_BUSINESS_DAYS};

pub type ArcoRequestId = i64;

/// A formal data-subject request (Access, Rectification, Cancellation,
/// Opposition). Append-only apart from the status/resolution fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcoRequest {
    pub id: ArcoRequestId,
    pub patient_id: PatientId,
    pub request_type: ArcoRequestType,
    pub description: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    pub status: ArcoStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

impl ArcoRequest {
    /// Date by which the controller must answer (20 business days).
    pub fn response_deadline(&self, calendar: &BusinessCalendar) -> NaiveDate {
        calendar.add_business_days(self.requested_at.date_naive(), ARCO_RESPONSE_BUSINESS_DAYS)
    }

    /// Date by which an accepted request must be carried out
    /// (15 business days after the response deadline).
    pub fn execution_deadline(&self, calendar: &BusinessCalendar) -> NaiveDate {
        calendar.add_business_days(self.response_deadline(calendar), ARCO_EXECUTION_BUSINESS_DAYS)
    }

    /// Open and past its response deadline.
    pub fn is_overdue(&self, calendar: &BusinessCalendar, today: NaiveDate) -> bool {
        self.status.is_open() && today > self.response_deadline(calendar)
    }
}

/// Contact fields taken from the external patient record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientContact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Caller input for a new ARCO request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcoDraft {
    pub request_type: ArcoRequestType,
    pub description: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl ArcoDraft {
    pub fn new(request_type: ArcoRequestType, description: impl Into<String>) -> Self {
        Self {
            request_type,
            description: description.into(),
            contact_email: None,
            contact_phone: None,
        }
    }

    /// Blank contact fields fall back to the patient's record.
    pub fn with_contact_defaults(mut self, contact: &PatientContact) -> Self {
        if is_blank(&self.contact_email) {
            self.contact_email = contact.email.clone().filter(|e| !e.trim().is_empty());
        }
        if is_blank(&self.contact_phone) {
            self.contact_phone = contact.phone.clone().filter(|p| !p.trim().is_empty());
        }
        self
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
