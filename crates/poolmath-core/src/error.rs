// ── Core error types ──
//
// Errors surfaced by poolmath-core. Fetch failures are recorded by the
// coordinator rather than returned from its background task; callers that
// drive fetches directly (or resolve share links) see them here.

use poolmath_api::FetchErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Setup ────────────────────────────────────────────────────────
    /// The pool source can never work as configured.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The source still uses a legacy share id and must be migrated first.
    #[error("Pool '{pool}' uses legacy share id '{share_id}' and must be migrated")]
    MigrationRequired { pool: String, share_id: String },

    // ── Runtime ──────────────────────────────────────────────────────
    /// A fetch failed; the next scheduled poll may succeed.
    #[error("Fetch failed ({kind}): {message}")]
    Fetch {
        kind: FetchErrorKind,
        message: String,
    },

    /// Restore state could not be read or written.
    #[error("Restore state error: {message}")]
    Restore { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn restore(message: impl Into<String>) -> Self {
        Self::Restore {
            message: message.into(),
        }
    }

    /// The fetch failure kind, if this is a fetch error.
    pub fn fetch_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::Fetch { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// ── Conversion from API errors ───────────────────────────────────────

impl From<poolmath_api::Error> for CoreError {
    fn from(err: poolmath_api::Error) -> Self {
        match err.fetch_kind() {
            Some(kind) => Self::Fetch {
                kind,
                message: err.to_string(),
            },
            None => Self::Configuration {
                message: err.to_string(),
            },
        }
    }
}
