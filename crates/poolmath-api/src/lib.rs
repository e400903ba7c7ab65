// poolmath-api: Async Rust client for the public Pool Math share API

pub mod client;
pub mod codes;
pub mod error;
pub mod models;
pub mod parse;
pub mod resolver;
pub mod share;
pub mod snapshot;
pub mod transport;

pub use client::{MIN_REQUEST_INTERVAL, PoolMathClient};
pub use codes::MeasurementCode;
pub use error::{Error, FetchErrorKind};
pub use parse::{parse_snapshot, parse_timestamp};
pub use resolver::ShareResolver;
pub use share::{PoolIds, ShareId, ShareLink};
pub use snapshot::{
    FetchOutcome, FetchSource, MeasurementReading, MeasurementValue, PoolInfo, Snapshot,
    TargetOverride,
};
pub use transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, TransportConfig};
