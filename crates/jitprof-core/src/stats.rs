//! Run-wide counters.
//!
//! The profiler is confined to one event stream, so these are plain
//! counters rather than atomics.

use serde::Serialize;

/// Counters updated on the event path
#[derive(Debug, Default, Clone)]
pub struct ShapeStats {
    /// Edges walked by full rebuilds plus incremental transitions
    pub edges_processed: u64,
    /// Full hidden-class rebuilds caused by a label-changing write
    pub invalidations: u64,
    /// Reads fed to the access-site monitor
    pub reads_observed: u64,
    /// Reads on untrackable bases
    pub reads_skipped: u64,
    /// Writes applied to a tracked shape
    pub writes_observed: u64,
    /// Writes on untrackable bases or accessor fields
    pub writes_skipped: u64,
}

/// Totals reported at end of execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeTotals {
    /// Distinct hidden classes created (root excluded)
    pub hidden_classes_created: u64,
    /// Property-insertion edges processed
    pub edges_processed: u64,
    /// Shape invalidations
    pub invalidations: u64,
    /// Objects with profiler metadata
    pub tracked_objects: u64,
    /// Distinct access sites seen
    pub access_sites: u64,
    /// Reads fed to the monitor
    pub reads_observed: u64,
    /// Reads skipped
    pub reads_skipped: u64,
    /// Writes applied to tracked shapes
    pub writes_observed: u64,
    /// Writes skipped
    pub writes_skipped: u64,
}

impl ShapeStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an edge walk
    #[inline]
    pub fn record_edge(&mut self) {
        self.edges_processed += 1;
    }

    /// Count a read by outcome
    #[inline]
    pub fn record_read(&mut self, observed: bool) {
        if observed {
            self.reads_observed += 1;
        } else {
            self.reads_skipped += 1;
        }
    }

    /// Count a write by outcome
    #[inline]
    pub fn record_write(&mut self, observed: bool) {
        if observed {
            self.writes_observed += 1;
        } else {
            self.writes_skipped += 1;
        }
    }

    /// Count a full rebuild caused by a write
    #[inline]
    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    /// Combine with state owned elsewhere into a snapshot
    pub fn snapshot(
        &self,
        hidden_classes_created: usize,
        tracked_objects: usize,
        access_sites: usize,
    ) -> ShapeTotals {
        ShapeTotals {
            hidden_classes_created: hidden_classes_created as u64,
            edges_processed: self.edges_processed,
            invalidations: self.invalidations,
            tracked_objects: tracked_objects as u64,
            access_sites: access_sites as u64,
            reads_observed: self.reads_observed,
            reads_skipped: self.reads_skipped,
            writes_observed: self.writes_observed,
            writes_skipped: self.writes_skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_counting() {
        let mut stats = ShapeStats::new();
        stats.record_read(true);
        stats.record_read(false);
        stats.record_read(true);
        stats.record_write(false);

        let totals = stats.snapshot(3, 2, 1);
        assert_eq!(totals.reads_observed, 2);
        assert_eq!(totals.reads_skipped, 1);
        assert_eq!(totals.writes_skipped, 1);
        assert_eq!(totals.hidden_classes_created, 3);
        assert_eq!(totals.access_sites, 1);
    }
}
