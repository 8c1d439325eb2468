use crate::{
    analytics::AnalyticsLog,
    error::{AppError, Result},
    id::IdGenerator,
    models::{AccessEvent, ClientInfo, GlobalStats, LinkStats, Shortened},
    store::LinkStore,
};
use axum::http::HeaderValue;
use chrono::Utc;
use url::Url;

/// Longest accepted target URL, in characters.
pub const MAX_URL_LENGTH: usize = 2048;

/// Accepted identifier lengths on the resolve path.
pub const ID_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 6..=10;

// ── Shorten ────────────────────────────────────────────────────────────────

/// Turns target URLs into link records, reusing the existing record when the
/// URL was shortened before.
#[derive(Clone, Debug)]
pub struct ShortenService {
    store: LinkStore,
    analytics: AnalyticsLog,
    generator: IdGenerator,
    reserved: Vec<String>,
}

impl ShortenService {
    pub fn new(store: LinkStore, analytics: AnalyticsLog, generator: IdGenerator) -> Self {
        Self {
            store,
            analytics,
            generator,
            reserved: Vec::new(),
        }
    }

    /// Never hand out any of `reserved` as an identifier.
    pub fn with_reserved<I, S>(mut self, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved = reserved.into_iter().map(Into::into).collect();
        self
    }

    pub fn shorten(&self, target_url: &str) -> Result<Shortened> {
        validate_target(target_url)?;

        if let Some(record) = self.store.find_by_target(target_url) {
            return Ok(Shortened {
                record,
                is_new: false,
            });
        }

        // Another caller may have shortened the same URL since the lookup
        // above; find_or_insert_with re-checks under the target's slot.
        let (record, is_new) = self.store.find_or_insert_with(target_url, || {
            self.generator
                .allocate(|candidate| {
                    if self.reserved.iter().any(|r| r == candidate) {
                        return None;
                    }
                    // Initialize before the record becomes visible. A candidate
                    // that turns out to be taken already has its own history.
                    self.analytics.initialize(candidate);
                    self.store.insert(candidate, target_url).ok()
                })
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "no free identifier for '{target_url}' after escalation"
                    ))
                })
        })?;

        if is_new {
            tracing::info!(
                identifier = %record.identifier,
                len = record.identifier.chars().count(),
                "URL shortened: {}",
                record.target_url
            );
        }

        Ok(Shortened { record, is_new })
    }
}

/// Reject empty, oversized, unparseable or non-http(s) URLs.
///
/// The target is sent back verbatim as a `Location` header, so anything that
/// is not a valid header value (control characters, raw newlines) is refused
/// here rather than at redirect time.
pub fn validate_target(target_url: &str) -> Result<()> {
    if target_url.is_empty() {
        return Err(AppError::InvalidInput("originalUrl is required".into()));
    }

    if target_url.chars().count() > MAX_URL_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "URL is too long (max {MAX_URL_LENGTH} characters)"
        )));
    }

    if target_url.chars().any(char::is_control) || HeaderValue::from_str(target_url).is_err() {
        return Err(AppError::InvalidInput(
            "Invalid URL format. URL must not contain control characters".into(),
        ));
    }

    match Url::parse(target_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::InvalidInput(
            "Invalid URL format. URL must start with http:// or https://".into(),
        )),
    }
}

// ── Resolve ────────────────────────────────────────────────────────────────

/// Maps identifiers back to their target URL, recording every hit.
#[derive(Clone, Debug)]
pub struct ResolveService {
    store: LinkStore,
    analytics: AnalyticsLog,
}

impl ResolveService {
    pub fn new(store: LinkStore, analytics: AnalyticsLog) -> Self {
        Self { store, analytics }
    }

    /// Resolve `identifier` to its exact stored target URL.
    ///
    /// The click counter and the access log are updated together under the
    /// record's write lock. Unknown or malformed identifiers leave no trace.
    pub fn resolve(&self, identifier: &str, client: &ClientInfo) -> Result<String> {
        if !ID_LENGTH_RANGE.contains(&identifier.chars().count()) {
            return Err(AppError::NotFound("Short URL not found".into()));
        }

        let now = Utc::now();
        let mut target_url = String::new();
        let clicks = self.store.record_click_then(identifier, now, |record| {
            self.analytics
                .append(identifier, AccessEvent::from_client(client, now));
            target_url.clone_from(&record.target_url);
        })?;

        tracing::info!(
            identifier,
            clicks,
            "Redirecting: {} → {}",
            identifier,
            target_url
        );

        Ok(target_url)
    }

    /// Record plus retained recent events for one identifier.
    pub fn stats(&self, identifier: &str) -> Result<LinkStats> {
        self.store
            .with_record(identifier, |record| LinkStats {
                record: record.clone(),
                recent_events: self.analytics.recent(identifier),
            })
            .ok_or_else(|| AppError::NotFound("Short URL not found".into()))
    }

    pub fn global_stats(&self) -> GlobalStats {
        self.store.global_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analytics::RECENT_EVENTS_LIMIT, id::DEFAULT_MAX_ATTEMPTS};
    use std::collections::HashSet;

    fn services() -> (ShortenService, ResolveService, LinkStore, AnalyticsLog) {
        services_with(IdGenerator::default())
    }

    fn services_with(
        generator: IdGenerator,
    ) -> (ShortenService, ResolveService, LinkStore, AnalyticsLog) {
        let store = LinkStore::new();
        let analytics = AnalyticsLog::new();
        (
            ShortenService::new(store.clone(), analytics.clone(), generator),
            ResolveService::new(store.clone(), analytics.clone()),
            store,
            analytics,
        )
    }

    fn client() -> ClientInfo {
        ClientInfo {
            user_agent: Some("curl/8.4.0".into()),
            client_address: Some("198.51.100.4".into()),
        }
    }

    #[test]
    fn shorten_resolve_scenario() {
        let (shortener, resolver, _, _) = services();

        let first = shortener.shorten("https://example.com/a").unwrap();
        assert!(first.is_new);
        assert_eq!(first.record.identifier.chars().count(), 7);

        let second = shortener.shorten("https://example.com/a").unwrap();
        assert!(!second.is_new);
        assert_eq!(second.record.identifier, first.record.identifier);

        let target = resolver.resolve(&first.record.identifier, &client()).unwrap();
        assert_eq!(target, "https://example.com/a");

        let stats = resolver.stats(&first.record.identifier).unwrap();
        assert_eq!(stats.record.click_count, 1);
        assert!(stats.record.last_accessed_at.is_some());
        assert_eq!(stats.recent_events.len(), 1);
        assert_eq!(stats.recent_events[0].client_address, "198.51.100.4");
    }

    #[test]
    fn shorten_creates_history() {
        let (shortener, _, _, analytics) = services();
        let shortened = shortener.shorten("http://example.com").unwrap();
        assert!(analytics.contains(&shortened.record.identifier));
    }

    #[test]
    fn invalid_input() {
        let (shortener, _, store, _) = services();
        let too_long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));

        for url in ["", "ftp://x", "not a url", "javascript:alert(1)", too_long.as_str()] {
            let err = shortener.shorten(url).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{url}: {err:?}");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn control_characters_are_rejected() {
        let (shortener, resolver, store, _) = services();

        for url in [
            "https://example.com/a\u{1}b",
            "https://example.com/\r\nSet-Cookie: x=1",
            "https://example.com/a\tb",
            "https://example.com/\u{7f}",
        ] {
            let err = shortener.shorten(url).unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{url:?}: {err:?}");
        }
        assert!(store.is_empty());
        assert_eq!(resolver.global_stats(), GlobalStats::default());

        // Non-ASCII is still a valid header value.
        assert!(validate_target("https://example.com/caf\u{e9}").is_ok());
    }

    #[test]
    fn length_limit_is_inclusive() {
        let prefix = "https://example.com/";
        let exact = format!("{prefix}{}", "a".repeat(MAX_URL_LENGTH - prefix.len()));
        assert_eq!(exact.len(), MAX_URL_LENGTH);
        assert!(validate_target(&exact).is_ok());

        let over = format!("{exact}a");
        assert!(validate_target(&over).is_err());
    }

    #[test]
    fn target_url_is_stored_verbatim() {
        let (shortener, resolver, _, _) = services();
        let url = "HTTPS://Example.com/Path?q=1#frag";
        let shortened = shortener.shorten(url).unwrap();

        assert_eq!(shortened.record.target_url, url);
        assert_eq!(
            resolver.resolve(&shortened.record.identifier, &client()).unwrap(),
            url
        );
    }

    #[test]
    fn resolve_not_found_leaves_no_trace() {
        let (_, resolver, _, analytics) = services();
        let before = resolver.global_stats();

        for id in ["doesnotexist", "abc", "", "abcdefg"] {
            let err = resolver.resolve(id, &client()).unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{id}");
            assert!(!analytics.contains(id));
        }
        assert_eq!(resolver.global_stats(), before);
    }

    #[test]
    fn stats_not_found() {
        let (_, resolver, _, _) = services();
        assert!(matches!(
            resolver.stats("abcdefg").unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn escalates_when_default_length_is_full() {
        // Two symbols at length 7 give 128 identifiers; fill them all.
        let generator = IdGenerator::with_alphabet("ab", 7, DEFAULT_MAX_ATTEMPTS);
        let (shortener, resolver, store, _) = services_with(generator.clone());

        let mut filled = 0;
        while store.len() < 128 {
            let candidate = generator.draw(7);
            if store.insert(&candidate, &format!("https://seed.example/{filled}")).is_ok() {
                filled += 1;
            }
        }

        let shortened = shortener.shorten("https://example.com/escalated").unwrap();
        assert!(shortened.is_new);
        assert_eq!(shortened.record.identifier.len(), 8);
        assert_eq!(
            resolver
                .resolve(&shortened.record.identifier, &client())
                .unwrap(),
            "https://example.com/escalated"
        );
    }

    #[test]
    fn exhausted_identifier_space_is_a_conflict() {
        let generator = IdGenerator::with_alphabet("a", 6, 3);
        let (shortener, _, store, _) = services_with(generator);
        store.insert("aaaaaa", "https://seed.example/6").unwrap();
        store.insert("aaaaaaa", "https://seed.example/7").unwrap();

        let err = shortener.shorten("https://example.com").unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.len(), 2);
        assert!(store.find_by_target("https://example.com").is_none());
    }

    #[test]
    fn reserved_identifiers_are_skipped() {
        // One symbol: the only length-6 candidate is reserved.
        let generator = IdGenerator::with_alphabet("h", 6, 3);
        let (shortener, _, store, analytics) = services_with(generator);
        let shortener = shortener.with_reserved(["hhhhhh"]);

        let shortened = shortener.shorten("https://example.com").unwrap();
        assert_eq!(shortened.record.identifier, "hhhhhhh");
        assert!(store.get("hhhhhh").is_none());
        assert!(!analytics.contains("hhhhhh"));
    }

    #[test]
    fn concurrent_shortens_are_unique() {
        let (shortener, _, store, _) = services();

        let ids: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let shortener = &shortener;
                    s.spawn(move || {
                        (0..200)
                            .map(|i| {
                                shortener
                                    .shorten(&format!("https://example.com/{t}/{i}"))
                                    .unwrap()
                                    .record
                                    .identifier
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), 1600);
        assert_eq!(unique.len(), 1600);
        assert_eq!(store.len(), 1600);
    }

    #[test]
    fn concurrent_shortens_of_same_url_dedup() {
        let (shortener, _, store, _) = services();

        let results: Vec<Shortened> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| shortener.shorten("https://example.com/same").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids: HashSet<&str> = results
            .iter()
            .map(|r| r.record.identifier.as_str())
            .collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(results.iter().filter(|r| r.is_new).count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_resolves_count_every_click() {
        let (shortener, resolver, _, _) = services();
        let id = shortener
            .shorten("https://example.com/hot")
            .unwrap()
            .record
            .identifier;

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..125 {
                        resolver.resolve(&id, &client()).unwrap();
                    }
                });
            }
        });

        let stats = resolver.stats(&id).unwrap();
        assert_eq!(stats.record.click_count, 1000);
        assert_eq!(stats.recent_events.len(), RECENT_EVENTS_LIMIT);
    }

    #[test]
    fn recent_events_track_min_of_clicks_and_limit() {
        let (shortener, resolver, _, _) = services();
        let id = shortener
            .shorten("https://example.com/few")
            .unwrap()
            .record
            .identifier;

        for n in 1..=12u64 {
            resolver.resolve(&id, &client()).unwrap();
            let stats = resolver.stats(&id).unwrap();
            assert_eq!(stats.record.click_count, n);
            assert_eq!(
                stats.recent_events.len(),
                (n as usize).min(RECENT_EVENTS_LIMIT)
            );
        }
    }

    #[test]
    fn global_stats() {
        let (shortener, resolver, _, _) = services();
        let a = shortener.shorten("https://a.example").unwrap().record.identifier;
        shortener.shorten("https://b.example").unwrap();
        resolver.resolve(&a, &client()).unwrap();
        resolver.resolve(&a, &client()).unwrap();

        assert_eq!(
            resolver.global_stats(),
            GlobalStats {
                total_links: 2,
                total_clicks: 2,
                active_links: 1,
            }
        );
    }
}
