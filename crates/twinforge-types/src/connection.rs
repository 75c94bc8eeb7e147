//! Inter-cloud connection records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// URL and token through which one cloud invokes glue hosted on another.
///
/// Written once by the glue deploy step of its boundary and read-only for
/// every later consumer. It must not be regenerated while the glue unit
/// still exists, since the token is baked into the upstream caller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterCloudConnection {
    pub url: String,
    pub token: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl InterCloudConnection {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            created_at: Utc::now(),
        }
    }

    /// A record is only usable when both halves are present
    pub fn is_resolvable(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl fmt::Debug for InterCloudConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterCloudConnection")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Connection records keyed by boundary key
pub type InterCloudRecords = BTreeMap<String, InterCloudConnection>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let conn = InterCloudConnection::new("https://example.net/ingest", "s3cret");
        let rendered = format!("{:?}", conn);
        assert!(rendered.contains("https://example.net/ingest"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_resolvable() {
        assert!(InterCloudConnection::new("https://a", "t").is_resolvable());
        assert!(!InterCloudConnection::new("", "t").is_resolvable());
        assert!(!InterCloudConnection::new("https://a", " ").is_resolvable());
    }
}
