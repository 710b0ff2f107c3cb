//! Error taxonomy shared by the stores, the HTTP client and the orchestrator.
//!
//! `PrivacyError` is `Clone` because one single-flight fetch result is handed
//! to every caller waiting on it.

use crate::models::ArcoStatus;

/// Client-side validation failures. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A contact phone is required to send the privacy notice")]
    MissingPhone,
    #[error("A revocation reason is required")]
    MissingReason,
    #[error("An ARCO request needs a description")]
    MissingDescription,
    #[error("Only an accepted consent can be revoked")]
    NotRevocable,
    #[error("ARCO request cannot move from {from} to {to}")]
    InvalidTransition { from: ArcoStatus, to: ArcoStatus },
}

impl ValidationError {
    /// Stable machine-readable code surfaced to callers verbatim.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPhone => "missing_phone",
            Self::MissingReason => "missing_reason",
            Self::MissingDescription => "missing_description",
            Self::NotRevocable => "not_revocable",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Errors from privacy API calls and store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrivacyError {
    /// 403/404 on the consent-status endpoint. A business state, not a failure:
    /// the consent store turns it into `has_consent = false`.
    #[error("Patient has no consent on record")]
    NoConsentYet,
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("No response from privacy service: {0}")]
    Network(String),
    #[error("Privacy service error (status {status})")]
    Server { status: u16 },
    #[error("Session expired")]
    AuthExpired,
    #[error("Unexpected response (status {status}): {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Invalid consent record: {0}")]
    InvalidRecord(String),
    #[error("Store was closed before the request completed")]
    Closed,
}

impl PrivacyError {
    /// Wording suitable for showing to staff.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "No se pudo contactar al servidor. Verifique su conexión e intente de nuevo.".into()
            }
            Self::Server { .. } => {
                "El servidor no pudo procesar la solicitud. Intente más tarde.".into()
            }
            Self::AuthExpired => "Su sesión expiró. Inicie sesión de nuevo.".into(),
            Self::Validation(v) => v.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
