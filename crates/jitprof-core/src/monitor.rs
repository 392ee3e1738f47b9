//! Per-call-site inline-cache simulation.
//!
//! Every read at a site produces a composite key `(class id, field)`. A read
//! whose key equals the previous one at that site is a hit, anything else is
//! a miss. Histograms keep first-encountered order so reports are stable.

use crate::field::FieldId;
use crate::host::LocationId;
use crate::shape::ClassId;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::fmt;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Composite key of one read: hidden class and field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiteKey {
    /// Hidden class of the base object
    pub class: ClassId,
    /// Field read
    pub field: FieldId,
}

/// Where the base object of a read was allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreationSite {
    /// Stamped allocation site
    Known(LocationId),
    /// Object was never seen being created
    Unknown,
}

impl From<Option<LocationId>> for CreationSite {
    fn from(site: Option<LocationId>) -> Self {
        site.map_or(CreationSite::Unknown, CreationSite::Known)
    }
}

impl fmt::Display for CreationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationSite::Known(site) => write!(f, "{site}"),
            CreationSite::Unknown => f.write_str("unknown"),
        }
    }
}

/// Accumulated reads at one call-site.
#[derive(Debug, Clone, Default)]
pub struct AccessSiteRecord {
    /// Key of the previous read
    pub last_key: Option<SiteKey>,
    /// Reads that repeated the previous key
    pub hits: u64,
    /// Reads that changed the key
    pub misses: u64,
    key_histogram: FxIndexMap<SiteKey, u64>,
    creation_histogram: FxIndexMap<CreationSite, u64>,
}

impl AccessSiteRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one read
    pub fn observe(&mut self, key: SiteKey, creation: CreationSite) {
        if self.last_key == Some(key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.last_key = Some(key);
        }
        *self.key_histogram.entry(key).or_insert(0) += 1;
        *self.creation_histogram.entry(creation).or_insert(0) += 1;
    }

    /// Occurrences per composite key, in first-seen order
    pub fn key_histogram(&self) -> impl Iterator<Item = (&SiteKey, &u64)> {
        self.key_histogram.iter()
    }

    /// Occurrences per creation site, in first-seen order
    pub fn creation_histogram(&self) -> impl Iterator<Item = (&CreationSite, &u64)> {
        self.creation_histogram.iter()
    }

    /// Number of distinct keys
    pub fn distinct_keys(&self) -> usize {
        self.key_histogram.len()
    }

    /// Number of distinct creation sites
    pub fn distinct_creation_sites(&self) -> usize {
        self.creation_histogram.len()
    }

    /// Count for one key
    pub fn key_count(&self, key: &SiteKey) -> u64 {
        self.key_histogram.get(key).copied().unwrap_or(0)
    }

    /// Total reads
    pub fn reads(&self) -> u64 {
        self.hits + self.misses
    }

    /// Whether the site saw more than one key
    pub fn is_polymorphic(&self) -> bool {
        self.key_histogram.len() > 1
    }
}

/// Table of [`AccessSiteRecord`]s keyed by call-site.
#[derive(Debug, Default)]
pub struct AccessSiteMonitor {
    sites: FxIndexMap<LocationId, AccessSiteRecord>,
}

impl AccessSiteMonitor {
    /// Create an empty monitor
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one read at `site`, creating its record on first use
    #[inline]
    pub fn record_read(&mut self, site: LocationId, key: SiteKey, creation: CreationSite) {
        self.sites.entry(site).or_default().observe(key, creation);
    }

    /// Record for one site
    pub fn site(&self, site: LocationId) -> Option<&AccessSiteRecord> {
        self.sites.get(&site)
    }

    /// All sites in first-seen order
    pub fn sites(&self) -> impl Iterator<Item = (LocationId, &AccessSiteRecord)> {
        self.sites.iter().map(|(site, record)| (*site, record))
    }

    /// Number of sites
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Whether no read has been recorded
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(class: u32) -> SiteKey {
        SiteKey {
            class: ClassId(class),
            field: FieldId(0),
        }
    }

    #[test]
    fn test_hit_miss_streak() {
        let mut record = AccessSiteRecord::new();
        for class in [1, 1, 1, 2, 1] {
            record.observe(key(class), CreationSite::Unknown);
        }
        // First read, 1->2 and 2->1 are misses.
        assert_eq!(record.misses, 3);
        assert_eq!(record.hits, 2);
        assert_eq!(record.key_count(&key(1)), 4);
        assert_eq!(record.key_count(&key(2)), 1);
        assert!(record.is_polymorphic());
    }

    #[test]
    fn test_streak_after_first_read() {
        let mut record = AccessSiteRecord::new();
        record.observe(key(1), CreationSite::Unknown);
        let (hits, misses) = (record.hits, record.misses);
        for class in [1, 1, 1, 2, 1] {
            record.observe(key(class), CreationSite::Unknown);
        }
        assert_eq!(record.misses - misses, 2);
        assert_eq!(record.hits - hits, 3);
    }

    #[test]
    fn test_creation_histogram_order() {
        let mut record = AccessSiteRecord::new();
        record.observe(key(1), CreationSite::Known(LocationId(9)));
        record.observe(key(1), CreationSite::Unknown);
        record.observe(key(1), CreationSite::Known(LocationId(9)));

        let sites: Vec<_> = record
            .creation_histogram()
            .map(|(site, count)| (*site, *count))
            .collect();
        assert_eq!(
            sites,
            vec![
                (CreationSite::Known(LocationId(9)), 2),
                (CreationSite::Unknown, 1)
            ]
        );
    }

    #[test]
    fn test_monitor_creates_sites_lazily() {
        let mut monitor = AccessSiteMonitor::new();
        assert!(monitor.site(LocationId(1)).is_none());

        monitor.record_read(LocationId(1), key(0), CreationSite::Unknown);
        monitor.record_read(LocationId(2), key(0), CreationSite::Unknown);
        monitor.record_read(LocationId(1), key(0), CreationSite::Unknown);

        assert_eq!(monitor.len(), 2);
        assert_eq!(monitor.site(LocationId(1)).unwrap().reads(), 2);
        let order: Vec<_> = monitor.sites().map(|(site, _)| site).collect();
        assert_eq!(order, vec![LocationId(1), LocationId(2)]);
    }
}
