use serde::{Deserialize, Serialize};

/// Raised when a wire string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(ConsentMethod {
    MessagingButton => "messaging_button",
    PaperSigned => "paper_signed",
    Tablet => "tablet",
    WebPortal => "web_portal",
});

// A patient without any record has no status at all (`ConsentSnapshot.record`
// is `None`). `Pending` and `Unknown` only exist to carry legacy values
// through ingestion.
str_enum!(ConsentStatus {
    Sent => "sent",
    Delivered => "delivered",
    Read => "read",
    Accepted => "accepted",
    Rejected => "rejected",
    Expired => "expired",
    Revoked => "revoked",
    Pending => "pending",
    Unknown => "unknown",
});

str_enum!(ArcoRequestType {
    Access => "access",
    Rectification => "rectification",
    Cancellation => "cancellation",
    Opposition => "opposition",
});

str_enum!(ArcoStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Resolved => "resolved",
    Rejected => "rejected",
});

impl ConsentStatus {
    /// Parse a legacy status string, keeping unrecognised values as `Unknown`.
    pub fn from_legacy(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            tracing::debug!(value, "Unrecognised legacy consent status");
            Self::Unknown
        })
    }

    /// Whether this status closes a notice cycle without a valid consent.
    pub fn ends_cycle_without_consent(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired)
    }
}

impl ArcoStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Open requests still carry a legal obligation to answer.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Forward-only lifecycle: pending → in_progress → resolved|rejected,
    /// or pending → resolved|rejected directly.
    pub fn can_transition_to(&self, next: ArcoStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::InProgress) => true,
            (Self::Pending | Self::InProgress, Self::Resolved | Self::Rejected) => true,
            _ => false,
        }
    }
}
