//! Consent expiration and renewal windows.
//!
//! Pure: takes `today` explicitly so it can run on every render or poll tick
//! without touching the clock or the network.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::config::{CONSENT_VALIDITY_DAYS, RENEWAL_WARNING_DAYS};
use crate::models::ConsentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpirationStatus {
    pub is_expiring: bool,
    pub is_expired: bool,
    pub days_until_expiration: i64,
    pub message: String,
    pub severity: Severity,
}

impl ExpirationStatus {
    /// Result for records that need no expiration check.
    pub fn not_applicable() -> Self {
        Self {
            is_expiring: false,
            is_expired: false,
            days_until_expiration: 0,
            message: String::new(),
            severity: Severity::Info,
        }
    }
}

/// Evaluate a consent record against the validity and warning windows.
pub fn evaluate(record: Option<&ConsentRecord>, today: NaiveDate) -> ExpirationStatus {
    let Some(record) = record else {
        return ExpirationStatus::not_applicable();
    };
    if record.is_revoked {
        return ExpirationStatus::not_applicable();
    }
    let Some(consent_day) = record.consent_day() else {
        return ExpirationStatus::not_applicable();
    };
    evaluate_from(consent_day, today)
}

/// Evaluate directly from the acceptance date.
pub fn evaluate_from(consent_day: NaiveDate, today: NaiveDate) -> ExpirationStatus {
    let expires_on = consent_day + Days::new(CONSENT_VALIDITY_DAYS as u64);
    let days = (expires_on - today).num_days();

    if days < 0 {
        ExpirationStatus {
            is_expiring: true,
            is_expired: true,
            days_until_expiration: days,
            message: expired_message(-days),
            severity: Severity::Error,
        }
    } else if days <= RENEWAL_WARNING_DAYS {
        ExpirationStatus {
            is_expiring: true,
            is_expired: false,
            days_until_expiration: days,
            message: expiring_message(days),
            severity: Severity::Warning,
        }
    } else {
        ExpirationStatus {
            is_expiring: false,
            is_expired: false,
            days_until_expiration: days,
            message: String::new(),
            severity: Severity::Info,
        }
    }
}

fn day_word(n: i64) -> &'static str {
    if n == 1 {
        "día"
    } else {
        "días"
    }
}

fn expiring_message(days: i64) -> String {
    if days == 0 {
        "El consentimiento de privacidad vence hoy. Solicite la renovación.".to_string()
    } else {
        format!(
            "El consentimiento de privacidad vence en {days} {}. Solicite la renovación.",
            day_word(days)
        )
    }
}

fn expired_message(days_ago: i64) -> String {
    format!(
        "El consentimiento de privacidad venció hace {days_ago} {}. Es necesario renovarlo.",
        day_word(days_ago)
    )
}
