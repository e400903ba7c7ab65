//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use poolmath_api::FetchErrorKind;
use poolmath_config::ConfigError;
use poolmath_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const NO_DATA: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Fetching ─────────────────────────────────────────────────────
    #[error("Could not reach Pool Math: {message}")]
    #[diagnostic(
        code(poolmath::connection_failed),
        help("Check your network connection, or raise the limit with --timeout.")
    )]
    ConnectionFailed { message: String },

    #[error("Pool Math request failed ({kind}): {message}")]
    #[diagnostic(code(poolmath::api_error))]
    ApiError { kind: String, message: String },

    #[error("No chemistry has been logged for pool '{pool}' yet")]
    #[diagnostic(
        code(poolmath::no_data),
        help("Log a test in the Pool Math app, then try again.")
    )]
    NoData { pool: String },

    // ── Pools ────────────────────────────────────────────────────────
    #[error("Pool '{name}' not found in configuration")]
    #[diagnostic(
        code(poolmath::pool_not_found),
        help(
            "Configured pools: {available}\n\
             Add one with: poolmath config add <KEY> <SHARE_URL>"
        )
    )]
    PoolNotFound { name: String, available: String },

    #[error("Pool '{key}' already exists")]
    #[diagnostic(
        code(poolmath::conflict),
        help("Remove it first with: poolmath config remove {key}")
    )]
    Conflict { key: String },

    #[error("No pools configured")]
    #[diagnostic(
        code(poolmath::no_config),
        help(
            "Add one with: poolmath config add <KEY> <SHARE_URL>\n\
             Or pass a share link with --url.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Pool '{pool}' still uses legacy share id '{share_id}'")]
    #[diagnostic(
        code(poolmath::migration_required),
        help("Run: poolmath migrate {pool}")
    )]
    MigrationRequired { pool: String, share_id: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(poolmath::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(poolmath::config),
        help("Check the config file with: poolmath config show")
    )]
    Config(Box<ConfigError>),

    #[error("Restore state error: {message}")]
    #[diagnostic(code(poolmath::restore), help("Delete the state directory to start fresh."))]
    Restore { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoData { .. } => exit_code::NO_DATA,
            Self::PoolNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::MigrationRequired { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the pool key to errors that carry one.
    pub fn for_pool(self, pool: &str) -> Self {
        match self {
            Self::NoData { .. } => Self::NoData { pool: pool.into() },
            other => other,
        }
    }
}

// ── ConfigError → CliError ───────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NotFound { pool } => Self::PoolNotFound {
                name: pool,
                available: String::new(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError ─────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration { message } => Self::Validation {
                field: "pool".into(),
                reason: message,
            },
            CoreError::MigrationRequired { pool, share_id } => {
                Self::MigrationRequired { pool, share_id }
            }
            CoreError::Fetch { kind, message } => Self::from_fetch(Some(kind), message),
            CoreError::Restore { message } => Self::Restore { message },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<poolmath_api::Error> for CliError {
    fn from(err: poolmath_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

impl CliError {
    /// Translate a failed fetch.
    pub fn from_fetch(kind: Option<FetchErrorKind>, message: String) -> Self {
        match kind {
            Some(FetchErrorKind::NetworkUnreachable) => Self::ConnectionFailed { message },
            Some(FetchErrorKind::NoData) => Self::NoData {
                pool: String::new(),
            },
            Some(kind) => Self::ApiError {
                kind: kind.to_string(),
                message,
            },
            None => Self::Validation {
                field: "pool".into(),
                reason: message,
            },
        }
    }
}
