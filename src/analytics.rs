use crate::models::{AccessEvent, ClientInfo};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::{collections::VecDeque, sync::Arc};
use woothee::parser::Parser;

/// How many access events are kept per identifier for external read.
pub const RECENT_EVENTS_LIMIT: usize = 10;

const UNKNOWN: &str = "Unknown";

/// Per-identifier bounded history of access events.
///
/// Retention is a presentation limit only: the authoritative click count
/// lives on the link record and is never derived from this log.
#[derive(Clone, Debug)]
pub struct AnalyticsLog {
    inner: Arc<DashMap<String, VecDeque<AccessEvent>>>,
    capacity: usize,
}

impl AnalyticsLog {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_EVENTS_LIMIT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Create an empty history for `identifier`. Existing history is kept.
    pub fn initialize(&self, identifier: &str) {
        self.inner
            .entry(identifier.to_owned())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
    }

    /// Append an event, dropping the oldest ones beyond capacity.
    pub fn append(&self, identifier: &str, event: AccessEvent) {
        let mut history = self.inner.entry(identifier.to_owned()).or_default();
        history.push_back(event);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// Retained events, most recent last.
    pub fn recent(&self, identifier: &str) -> Vec<AccessEvent> {
        self.inner
            .get(identifier)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.inner.contains_key(identifier)
    }
}

impl Default for AnalyticsLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessEvent {
    /// Build an event from caller metadata, filling blanks with `Unknown` and
    /// parsing the User-Agent for browser / OS / device.
    pub fn from_client(client: &ClientInfo, timestamp: DateTime<Utc>) -> Self {
        let user_agent = non_empty(client.user_agent.as_deref());
        let (browser, os, device) = parse_user_agent(user_agent);

        Self {
            timestamp,
            user_agent: user_agent.unwrap_or(UNKNOWN).to_owned(),
            client_address: non_empty(client.client_address.as_deref())
                .unwrap_or(UNKNOWN)
                .to_owned(),
            browser,
            os,
            device,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a User-Agent string using woothee and return
/// `(browser_name, os_name, device_category)`.
fn parse_user_agent(ua: Option<&str>) -> (Option<String>, Option<String>, Option<String>) {
    let Some(ua) = ua else {
        return (None, None, None);
    };

    let known = |value: &str| {
        if value.is_empty() || value == "UNKNOWN" {
            None
        } else {
            Some(value.to_owned())
        }
    };

    match Parser::new().parse(ua) {
        Some(result) => (known(result.name), known(result.os), known(result.category)),
        None => (None, None, None),
    }
}
