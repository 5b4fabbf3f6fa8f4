//! ABOUTME: Core types, errors, IDs, and tracing utilities
//! ABOUTME: Foundation crate used by all other lyrica components

pub mod error;
pub mod id;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use id::Id;
pub use time::{now_iso8601, to_rfc3339, utc_now};

/// User id recorded for activity from callers that are not signed in
pub const GUEST_USER_ID: &str = "guest";
