//! The profiling context.
//!
//! [`ShapeProfiler`] owns all engine state for one run: the shadow store, the
//! transition trie (inside the assigner), the access-site table and the
//! counters. The host calls the `on_*` callbacks in program order and finally
//! [`ShapeProfiler::end_of_execution`].
//!
//! Callbacks never fail. Anything that cannot be analysed is skipped.

use crate::assigner::{HiddenClassAssigner, WriteEffect};
use crate::config::ProfilerConfig;
use crate::host::{ARGUMENTS_NAME, Capability, HostHeap, LocationId, ObjectRef, Value};
use crate::monitor::{AccessSiteMonitor, AccessSiteRecord, CreationSite, SiteKey};
use crate::rank::rank_sites;
use crate::report::{PolymorphismReport, ReportSink, Reporter};
use crate::shadow::ShadowStore;
use crate::shape::{ClassId, NodeId};
use crate::stats::{ShapeStats, ShapeTotals};

/// Hidden-class and inline-cache profiler for a single event stream.
///
/// Confined to one event stream. A host with several target threads needs one
/// profiler per thread or its own locking around every callback.
#[derive(Debug, Default)]
pub struct ShapeProfiler {
    config: ProfilerConfig,
    shadows: ShadowStore,
    assigner: HiddenClassAssigner,
    monitor: AccessSiteMonitor,
    stats: ShapeStats,
}

impl ShapeProfiler {
    /// Create a profiler with the given report limits
    pub fn new(config: ProfilerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Report limits in effect
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// An object or function literal was created, or a constructor returned.
    pub fn on_object_created<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        site: LocationId,
        value: &Value,
    ) {
        let Some(obj) = value.as_object() else {
            return;
        };
        if heap.kind_of(obj).is_none() {
            tracing::trace!(site = site.0, object = obj.0, "creation of unknown object");
            return;
        }
        self.shadows.stamp_creation(obj, site);
    }

    /// A property is about to be read at `site`.
    pub fn on_property_read_pre<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        site: LocationId,
        base: &Value,
        field: &str,
    ) {
        let capability = Capability::of_base(heap, base, |obj| self.shadows.is_arguments_like(obj));
        let observed = match capability.trackable() {
            Some(obj) => self.observe_read(heap, site, obj, field),
            None => {
                tracing::trace!(site = site.0, ?capability, field, "read skipped");
                false
            }
        };
        self.stats.record_read(observed);
    }

    /// A property is about to be written.
    ///
    /// The write site is not used for shape tracking; writes are not modeled
    /// as inline-cache reads.
    pub fn on_property_write_pre<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        site: LocationId,
        base: &Value,
        field: &str,
        new_value: &Value,
    ) {
        let capability =
            Capability::of_access(heap, base, field, |obj| self.shadows.is_arguments_like(obj));
        let Some(obj) = capability.trackable() else {
            tracing::trace!(site = site.0, ?capability, field, "write skipped");
            self.stats.record_write(false);
            return;
        };
        let effect = self.assigner.update_on_write(
            heap,
            &mut self.shadows,
            &mut self.stats,
            obj,
            field,
            new_value,
        );
        self.stats.record_write(effect != WriteEffect::Untracked);
    }

    /// A variable was read. Only the arguments object is of interest.
    pub fn on_variable_read(&mut self, name: &str, value: &Value) {
        if name != ARGUMENTS_NAME {
            return;
        }
        if let Some(obj) = value.as_object() {
            self.shadows.get_or_create(obj).arguments_like = true;
        }
    }

    /// End of the run: rank sites and hand the report to `sink`.
    ///
    /// A failing sink is logged and does not affect the collected state; the
    /// assembled report is returned either way.
    pub fn end_of_execution(&self, sink: &mut dyn ReportSink) -> PolymorphismReport {
        let report = self.report();
        tracing::debug!(
            sites = report.sites.len(),
            classes = report.totals.hidden_classes_created,
            "emitting polymorphism report"
        );
        if let Err(err) = sink.emit(&report) {
            tracing::error!(error = %err, "failed to emit polymorphism report");
        }
        report
    }

    /// Build the report without emitting it
    pub fn report(&self) -> PolymorphismReport {
        let ranked = rank_sites(&self.monitor);
        Reporter::new(&self.config, self.assigner.trie(), self.assigner.fields())
            .build(&ranked, self.totals())
    }

    /// Run-wide totals so far
    pub fn totals(&self) -> ShapeTotals {
        self.stats.snapshot(
            self.assigner.trie().classes_created(),
            self.shadows.len(),
            self.monitor.len(),
        )
    }

    /// Current hidden class of `obj`, computing it if needed.
    pub fn hidden_class<H: HostHeap + ?Sized>(&mut self, heap: &H, obj: ObjectRef) -> Option<NodeId> {
        self.assigner
            .hidden_class(heap, &mut self.shadows, &mut self.stats, obj, false)
    }

    /// Public id of `obj`'s current hidden class
    pub fn class_id<H: HostHeap + ?Sized>(&mut self, heap: &H, obj: ObjectRef) -> Option<ClassId> {
        let node = self.hidden_class(heap, obj)?;
        Some(self.assigner.trie_mut().class_id(node))
    }

    /// Layout of a hidden class as edge descriptions, prototype first
    pub fn describe_layout(&self, node: NodeId) -> Vec<String> {
        let fields = self.assigner.fields();
        self.assigner
            .trie()
            .layout(node)
            .iter()
            .map(|label| label.describe(fields))
            .collect()
    }

    /// Accumulated reads at `site`
    pub fn site(&self, site: LocationId) -> Option<&AccessSiteRecord> {
        self.monitor.site(site)
    }

    /// The access-site table
    pub fn monitor(&self) -> &AccessSiteMonitor {
        &self.monitor
    }

    /// The hidden-class assigner
    pub fn assigner(&self) -> &HiddenClassAssigner {
        &self.assigner
    }

    /// The shadow store
    pub fn shadows(&self) -> &ShadowStore {
        &self.shadows
    }

    fn observe_read<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        site: LocationId,
        obj: ObjectRef,
        field: &str,
    ) -> bool {
        let Some(node) = self
            .assigner
            .hidden_class(heap, &mut self.shadows, &mut self.stats, obj, false)
        else {
            return false;
        };
        let key = SiteKey {
            class: self.assigner.trie_mut().class_id(node),
            field: self.assigner.intern_field(field),
        };
        let creation: CreationSite = self
            .shadows
            .get(obj)
            .and_then(|record| record.creation_site)
            .into();
        self.monitor.record_read(site, key, creation);
        true
    }
}
