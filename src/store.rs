use crate::{
    error::{AppError, Result},
    models::{GlobalStats, LinkRecord},
};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

/// Thread-safe in-memory mapping identifier -> [`LinkRecord`], plus a reverse
/// index target URL -> identifier used for idempotent re-shortening.
///
/// Both maps are DashMaps, so lookups and click updates on different
/// identifiers proceed in parallel. Lock order is always
/// `by_target` -> `links` -> analytics; nothing takes `by_target` while
/// holding a `links` guard.
#[derive(Clone, Debug, Default)]
pub struct LinkStore {
    links: Arc<DashMap<String, LinkRecord>>,
    by_target: Arc<DashMap<String, String>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match lookup of the record already shortened for `target_url`.
    pub fn find_by_target(&self, target_url: &str) -> Option<LinkRecord> {
        let identifier = self.by_target.get(target_url).map(|id| id.clone())?;
        self.get(&identifier)
    }

    /// Return the record for `target_url`, or create one with `create` while
    /// the target's slot is held.
    ///
    /// Concurrent callers for the same target serialize on that slot, so at
    /// most one of them runs `create`; the rest observe its record. The
    /// returned flag is `true` when the record was created by this call.
    pub fn find_or_insert_with<F>(
        &self,
        target_url: &str,
        create: F,
    ) -> Result<(LinkRecord, bool)>
    where
        F: FnOnce() -> Result<LinkRecord>,
    {
        match self.by_target.entry(target_url.to_owned()) {
            Entry::Occupied(slot) => {
                let record = self.get(slot.get()).ok_or_else(|| {
                    AppError::Internal(format!(
                        "target index points at missing identifier '{}'",
                        slot.get()
                    ))
                })?;
                Ok((record, false))
            }
            Entry::Vacant(slot) => {
                let record = create()?;
                slot.insert(record.identifier.clone());
                Ok((record, true))
            }
        }
    }

    /// Claim `identifier` for `target_url`.
    ///
    /// The check and the insert happen under one shard lock, so two callers
    /// can never both claim the same identifier. Only the identifier map is
    /// written; the target index is filled in by
    /// [`LinkStore::find_or_insert_with`] once its closure returns.
    pub fn insert(&self, identifier: &str, target_url: &str) -> Result<LinkRecord> {
        match self.links.entry(identifier.to_owned()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "identifier '{identifier}' already exists"
            ))),
            Entry::Vacant(slot) => {
                let record = LinkRecord::new(identifier, target_url);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<LinkRecord> {
        self.with_record(identifier, LinkRecord::clone)
    }

    /// Run `f` against the record while it is read-locked.
    pub fn with_record<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(&LinkRecord) -> R,
    ) -> Option<R> {
        self.links.get(identifier).map(|record| f(record.value()))
    }

    /// Bump the click counter and last-access time. Returns the new count.
    pub fn record_click(&self, identifier: &str, at: DateTime<Utc>) -> Result<u64> {
        self.record_click_then(identifier, at, |_| ())
    }

    /// Like [`LinkStore::record_click`], but runs `then` before the record's
    /// write lock is released. Readers of this identifier never see the new
    /// count without whatever `then` did.
    pub fn record_click_then(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
        then: impl FnOnce(&LinkRecord),
    ) -> Result<u64> {
        let mut record = self
            .links
            .get_mut(identifier)
            .ok_or_else(|| AppError::NotFound("Short URL not found".into()))?;

        record.click_count += 1;
        record.last_accessed_at = Some(at);
        then(record.value());

        Ok(record.click_count)
    }

    pub fn global_stats(&self) -> GlobalStats {
        self.links
            .iter()
            .fold(GlobalStats::default(), |mut stats, record| {
                stats.total_links += 1;
                stats.total_clicks += record.click_count;
                if record.click_count > 0 {
                    stats.active_links += 1;
                }
                stats
            })
    }

    /// Number of stored links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
