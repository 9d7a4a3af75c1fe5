//! RotaBot error taxonomy.
//!
//! Every fault the core can surface is a variant here. Collaborator
//! faults (store, gateway) are mapped into their typed variants at the
//! implementation boundary so callers can match on them without
//! knowing which backend is wired in.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, RotaBotError>;

#[derive(Debug, Error)]
pub enum RotaBotError {
    /// A rota definition the engine cannot work with: empty
    /// participant list or an unparseable duty duration.
    /// Configuration defect — surfaced immediately, never retried.
    #[error("invalid rota '{rota_id}': {reason}")]
    InvalidRota { rota_id: String, reason: String },

    /// The requested rota id is not in the configured rota set.
    #[error("rota not found: {0}")]
    RotaNotFound(String),

    /// The history store could not be reached.
    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),

    /// The history store rejected the call due to throttling.
    #[error("history store throttled: {0}")]
    StoreThrottled(String),

    /// The history store failed internally.
    #[error("history store internal error: {0}")]
    StoreInternal(String),

    /// A rota's alert schedule expression could not be parsed.
    /// Reported once; that rota's alerting stays disabled until restart.
    #[error("schedule registration failed for rota '{rota_id}': {reason}")]
    ScheduleRegistrationFailed { rota_id: String, reason: String },

    /// A display name could not be resolved to a platform identity.
    /// Callers degrade to the raw display name rather than failing.
    #[error("identity resolution failed for '{0}'")]
    IdentityResolution(String),

    /// Chat gateway fault (connect, send, listen).
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration load/parse fault.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RotaBotError {
    /// True for the store-fault variants, regardless of flavor.
    pub fn is_store_fault(&self) -> bool {
        matches!(
            self,
            RotaBotError::StoreUnavailable(_)
                | RotaBotError::StoreThrottled(_)
                | RotaBotError::StoreInternal(_)
        )
    }
}
