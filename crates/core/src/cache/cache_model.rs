//! Account and portfolio cache models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// The two single-row caches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Account,
    Portfolio,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Account => f.write_str("account"),
            CacheKind::Portfolio => f.write_str("portfolio"),
        }
    }
}

/// A cached payload with its fetch time.
///
/// `is_stale` is set when the latest cycle failed to refresh the payload;
/// the payload itself is then the last one fetched successfully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedPayload {
    pub kind: CacheKind,
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl CachedPayload {
    /// Decodes the payload into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
