use chrono::{DateTime, Utc};
use serde::Serialize;

/// One shortened URL.
///
/// `identifier`, `target_url` and `created_at` never change after insert;
/// only the click fields move, and only through [`crate::store::LinkStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub identifier: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub click_count: u64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl LinkRecord {
    pub fn new(identifier: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            target_url: target_url.into(),
            created_at: Utc::now(),
            click_count: 0,
            last_accessed_at: None,
        }
    }
}

/// Who resolved a link. Both fields are free text and may be unknown.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub client_address: Option<String>,
}

/// A single recorded resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    #[serde(rename = "ip")]
    pub client_address: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
}

/// Result of a shorten call: the record plus whether it was created just now.
#[derive(Debug, Clone)]
pub struct Shortened {
    pub record: LinkRecord,
    pub is_new: bool,
}

/// Per-link statistics: the record and its retained recent events.
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub record: LinkRecord,
    /// Oldest first, at most [`crate::analytics::RECENT_EVENTS_LIMIT`] long.
    pub recent_events: Vec<AccessEvent>,
}

/// Store-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    #[serde(rename = "totalUrls")]
    pub total_links: usize,
    pub total_clicks: u64,
    #[serde(rename = "activeUrls")]
    pub active_links: usize,
}
