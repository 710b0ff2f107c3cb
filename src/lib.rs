pub mod api;
pub mod arco_store;
pub mod business_days;
pub mod cache;
pub mod compliance;
pub mod config;
pub mod consent_store;
pub mod error;
pub mod expiration;
pub mod models;
pub mod polling;
pub mod presenter;
pub mod single_flight;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing_subscriber::EnvFilter;

pub use arco_store::ArcoStore;
pub use compliance::{BlockReason, ComplianceOrchestrator, ComplianceReport, ConsultationGate};
pub use config::{ApiConfig, EngineConfig};
pub use consent_store::ConsentStore;
pub use error::{PrivacyError, ValidationError};

/// Install the fmt subscriber. `RUST_LOG` wins over the crate default.
/// A second call is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Consent engine v{}", config::APP_VERSION);
    }
}

/// Lock a std mutex, recovering the data if a holder panicked.
/// Guards never cross an `.await`.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
