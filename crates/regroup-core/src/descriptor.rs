//! Descriptions of the requests a grouping page (re)issues on fetch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::ApiRequest;

/// Default page size for both grouping endpoints.
pub const DEFAULT_LIMIT: u32 = 50;

/// Which collection a response fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKey {
    Merged,
    Similar,
}

impl DataKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Similar => "similar",
        }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One GET to issue during a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchDescriptor {
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub data_key: DataKey,
}

impl FetchDescriptor {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, data_key: DataKey) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: Vec::new(),
            data_key,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add `cursor=<value>` when a cursor is given.
    #[must_use]
    pub fn with_cursor(self, cursor: Option<&str>) -> Self {
        match cursor {
            Some(cursor) => self.with_query("cursor", cursor),
            None => self,
        }
    }

    #[must_use]
    pub fn to_request(&self) -> ApiRequest {
        ApiRequest::get(self.endpoint.clone()).extend_query(&self.query)
    }
}

/// Fingerprints merged into `group_id`.
#[must_use]
pub fn merged_for(group_id: &str, limit: u32) -> FetchDescriptor {
    FetchDescriptor::new(format!("/issues/{group_id}/hashes/"), DataKey::Merged)
        .with_query("limit", limit.to_string())
}

/// Issues similar to `group_id`, scored with the v1 feature layout.
#[must_use]
pub fn similar_for(group_id: &str, limit: u32) -> FetchDescriptor {
    FetchDescriptor::new(format!("/issues/{group_id}/similar/"), DataKey::Similar)
        .with_query("limit", limit.to_string())
        .with_query("version", "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;

    #[test]
    fn merged_descriptor_targets_hashes() {
        let desc = merged_for("42", DEFAULT_LIMIT);
        assert_eq!(desc.endpoint, "/issues/42/hashes/");
        assert_eq!(desc.data_key, DataKey::Merged);
        assert_eq!(desc.query, vec![("limit".to_string(), "50".to_string())]);
    }

    #[test]
    fn similar_descriptor_pins_version() {
        let req = similar_for("42", 10).with_cursor(Some("0:10:0")).to_request();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/issues/42/similar/");
        assert_eq!(req.query_values("version"), vec!["1"]);
        assert_eq!(req.query_values("limit"), vec!["10"]);
        assert_eq!(req.query_values("cursor"), vec!["0:10:0"]);
    }

    #[test]
    fn data_key_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DataKey::Similar).expect("serialize"),
            "\"similar\""
        );
        assert_eq!(DataKey::Merged.to_string(), "merged");
    }
}
