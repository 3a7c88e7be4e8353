//! Domain services over the partitioned store.
//!
//! Services own id allocation and the mapping between typed models and the
//! store's attribute maps. Stored attributes are the full serialized model
//! (key fields included), so an item read back deserializes directly.

pub mod feedback;
pub mod reports;

pub use feedback::FeedbackService;
pub use reports::ReportService;

use crate::errors::ApiError;
use crate::store::Attributes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Build a sort key of the form `<PREFIX>#<rfc3339-millis>#<rand>`.
///
/// The embedded timestamp makes lexicographic order equal creation order;
/// the random suffix disambiguates same-millisecond writes.
fn sort_key(prefix: &str, created_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let short = suffix.get(..8).unwrap_or("00000000");
    format!(
        "{}#{}#{}",
        prefix,
        created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        short
    )
}

fn to_attributes<T: Serialize>(model: &T) -> Result<Attributes, ApiError> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(ApiError::internal()),
    }
}

fn from_attributes<T: DeserializeOwned>(attributes: Attributes) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(attributes))
        .map_err(|e| ApiError::database(format!("stored item failed to deserialize: {}", e)))
}
