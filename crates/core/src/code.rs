//! Human-readable document codes (movements, orders).

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a document code such as `MV-20261016-1A2B3C4D`.
///
/// The suffix is taken from the random tail of a UUIDv7, so codes generated
/// within the same millisecond still differ.
pub fn generate_code(prefix: &str, at: DateTime<Utc>) -> String {
    let id = Uuid::now_v7().simple().to_string().to_uppercase();
    let suffix = &id[id.len() - 8..];
    format!("{prefix}-{}-{suffix}", at.format("%Y%m%d"))
}
