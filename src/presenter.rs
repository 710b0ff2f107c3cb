//! Consent status label + color for display.
//!
//! Rule order matters: the canonical boolean always beats the legacy status.

use serde::Serialize;

use crate::models::{ConsentGiven, ConsentRecord, ConsentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Success,
    Warning,
    Error,
    Info,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub text: String,
    pub color: StatusColor,
}

impl StatusLabel {
    fn new(text: &str, color: StatusColor) -> Self {
        Self {
            text: text.to_string(),
            color,
        }
    }
}

/// Label for a consent record.
///
/// Revocation is not distinguished here (a revoked record reads as
/// "pending" through `consent_given = no`); use [`present_with_revocation`]
/// when a separate "revoked" label is needed.
pub fn present(record: Option<&ConsentRecord>) -> StatusLabel {
    let Some(record) = record else {
        return StatusLabel::new("no consent", StatusColor::Neutral);
    };
    match record.consent_given {
        ConsentGiven::Yes => StatusLabel::new("accepted", StatusColor::Success),
        ConsentGiven::No => StatusLabel::new("pending", StatusColor::Warning),
        ConsentGiven::Unknown => legacy_label(record.status),
    }
}

/// Same as [`present`], but a revoked record reads "revoked".
pub fn present_with_revocation(record: Option<&ConsentRecord>) -> StatusLabel {
    match record {
        Some(r) if r.is_revoked => StatusLabel::new("revoked", StatusColor::Error),
        _ => present(record),
    }
}

fn legacy_label(status: ConsentStatus) -> StatusLabel {
    let color = match status {
        ConsentStatus::Accepted => StatusColor::Success,
        ConsentStatus::Rejected | ConsentStatus::Expired => StatusColor::Error,
        ConsentStatus::Pending => StatusColor::Warning,
        ConsentStatus::Sent | ConsentStatus::Delivered | ConsentStatus::Read => StatusColor::Info,
        _ => StatusColor::Neutral,
    };
    StatusLabel::new(status.as_str(), color)
}
