//! # jitprof-core
//!
//! Runtime shape/polymorphism profiling for a dynamic object language.
//!
//! The profiler observes property reads, property writes and object
//! creation, simulates engine hidden classes with a transition trie, and
//! reports the call-sites whose inline caches keep missing because the
//! objects flowing through them change layout.
//!
//! ```
//! use jitprof_core::{LocationId, MemoryHeap, ShapeProfiler, Value};
//!
//! let mut heap = MemoryHeap::new();
//! let mut profiler = ShapeProfiler::default();
//! let obj = heap.alloc_object(Value::Null);
//!
//! profiler.on_property_write_pre(&heap, LocationId(1), &Value::Object(obj), "x", &Value::Number(1.0));
//! heap.set(obj, "x", Value::Number(1.0));
//! profiler.on_property_read_pre(&heap, LocationId(2), &Value::Object(obj), "x");
//!
//! assert_eq!(profiler.site(LocationId(2)).unwrap().misses, 1);
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod assigner;
pub mod config;
pub mod error;
pub mod field;
pub mod heap;
pub mod host;
pub mod monitor;
pub mod profiler;
pub mod rank;
pub mod report;
pub mod shadow;
pub mod shape;
pub mod stats;

pub use assigner::{HiddenClassAssigner, WriteEffect};
pub use config::ProfilerConfig;
pub use error::ReportError;
pub use field::{FieldId, FieldInterner};
pub use heap::MemoryHeap;
pub use host::{
    ARGUMENTS_NAME, Capability, FieldSlot, HostHeap, LocationId, ObjectKind, ObjectRef,
    PROTO_FIELD, Value,
};
pub use monitor::{AccessSiteMonitor, AccessSiteRecord, CreationSite, SiteKey};
pub use profiler::ShapeProfiler;
pub use rank::{RankedSite, rank, rank_sites, second_largest};
pub use report::{
    CreationAccess, FieldReads, JsonSink, LayoutReport, PolymorphismReport, ReportSink, Reporter,
    SiteReport, TextSink,
};
pub use shadow::{ShadowRecord, ShadowStore};
pub use shape::{ClassId, EdgeKind, EdgeLabel, NodeId, TransitionNode, TransitionTrie};
pub use stats::{ShapeStats, ShapeTotals};
