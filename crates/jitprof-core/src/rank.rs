//! Contention ranking of access sites.

use crate::host::LocationId;
use crate::monitor::{AccessSiteMonitor, AccessSiteRecord};

/// A site with its computed rank
#[derive(Debug, Clone, Copy)]
pub struct RankedSite<'a> {
    /// Call-site
    pub site: LocationId,
    /// Accumulated reads
    pub record: &'a AccessSiteRecord,
    /// Contention score
    pub rank: u64,
}

/// Second-highest value of a multiset, 0 with fewer than two values.
///
/// Equal values count separately, so `[5, 5]` yields 5.
pub fn second_largest(values: impl IntoIterator<Item = u64>) -> u64 {
    let mut first: Option<u64> = None;
    let mut second: Option<u64> = None;
    for value in values {
        match first {
            Some(max) if value <= max => {
                if second.is_none_or(|s| value > s) {
                    second = Some(value);
                }
            }
            _ => {
                second = first;
                first = Some(value);
            }
        }
    }
    second.unwrap_or(0)
}

/// Misses plus the frequency of the second most common key.
///
/// Sites that oscillate between two hot shapes outrank sites that are merely
/// wide across many cold ones.
pub fn rank(record: &AccessSiteRecord) -> u64 {
    record.misses + second_largest(record.key_histogram().map(|(_, count)| *count))
}

/// All sites sorted by descending rank; ties keep first-seen order.
pub fn rank_sites(monitor: &AccessSiteMonitor) -> Vec<RankedSite<'_>> {
    let mut ranked: Vec<_> = monitor
        .sites()
        .map(|(site, record)| RankedSite {
            site,
            record,
            rank: rank(record),
        })
        .collect();
    ranked.sort_by(|a, b| b.rank.cmp(&a.rank));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldId;
    use crate::monitor::{CreationSite, SiteKey};
    use crate::shape::ClassId;

    fn key(class: u32) -> SiteKey {
        SiteKey {
            class: ClassId(class),
            field: FieldId(0),
        }
    }

    fn record(classes: &[u32]) -> AccessSiteRecord {
        let mut record = AccessSiteRecord::new();
        for class in classes {
            record.observe(key(*class), CreationSite::Unknown);
        }
        record
    }

    #[test]
    fn test_second_largest() {
        assert_eq!(second_largest(std::iter::empty()), 0);
        assert_eq!(second_largest([7]), 0);
        assert_eq!(second_largest([3, 9, 4]), 4);
        assert_eq!(second_largest([9, 3, 4]), 4);
        assert_eq!(second_largest([5, 5]), 5);
        assert_eq!(second_largest([1, 2, 3, 4]), 3);
    }

    #[test]
    fn test_rank_monomorphic_site() {
        let r = record(&[1, 1, 1, 1]);
        assert_eq!(rank(&r), 1);
    }

    #[test]
    fn test_rank_two_hot_shapes() {
        // 1,2,1,2,1,2: six misses, second-largest bucket 3.
        let r = record(&[1, 2, 1, 2, 1, 2]);
        assert_eq!(r.misses, 6);
        assert_eq!(rank(&r), 9);
    }

    #[test]
    fn test_rank_is_monotonic_in_misses() {
        let mut r = record(&[1, 1, 2, 2, 3]);
        let before = rank(&r);
        r.misses += 1;
        assert!(rank(&r) > before);
    }

    #[test]
    fn test_rank_sites_order() {
        let mut monitor = AccessSiteMonitor::new();
        for class in [1, 1, 1] {
            monitor.record_read(LocationId(1), key(class), CreationSite::Unknown);
        }
        for class in [1, 2, 1, 2] {
            monitor.record_read(LocationId(2), key(class), CreationSite::Unknown);
        }
        for class in [3, 3, 3] {
            monitor.record_read(LocationId(3), key(class), CreationSite::Unknown);
        }

        let ranked = rank_sites(&monitor);
        let order: Vec<_> = ranked.iter().map(|r| (r.site, r.rank)).collect();
        assert_eq!(
            order,
            vec![(LocationId(2), 6), (LocationId(1), 1), (LocationId(3), 1)]
        );
    }
}
