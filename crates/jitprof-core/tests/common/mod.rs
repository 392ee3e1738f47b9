//! Drives a `MemoryHeap` and a `ShapeProfiler` the way an instrumented host
//! would: every callback fires before the host applies the operation.

#![allow(dead_code)]

use jitprof_core::{LocationId, MemoryHeap, NodeId, ObjectKind, ObjectRef, ShapeProfiler, Value};

pub struct Session {
    pub heap: MemoryHeap,
    pub profiler: ShapeProfiler,
}

impl Session {
    pub fn new() -> Self {
        Self {
            heap: MemoryHeap::new(),
            profiler: ShapeProfiler::default(),
        }
    }

    /// `new` / literal at `site` with the given prototype
    pub fn create(&mut self, site: u32, prototype: Value) -> ObjectRef {
        let obj = self.heap.alloc_object(prototype);
        self.profiler
            .on_object_created(&self.heap, LocationId(site), &Value::Object(obj));
        obj
    }

    pub fn function(&mut self, site: u32) -> ObjectRef {
        let f = self.heap.alloc(ObjectKind::Function, Value::Null);
        self.profiler
            .on_object_created(&self.heap, LocationId(site), &Value::Object(f));
        f
    }

    pub fn write(&mut self, obj: ObjectRef, field: &str, value: Value) {
        self.profiler.on_property_write_pre(
            &self.heap,
            LocationId(0),
            &Value::Object(obj),
            field,
            &value,
        );
        self.heap.set(obj, field, value);
    }

    pub fn read(&mut self, site: u32, obj: ObjectRef, field: &str) -> Option<Value> {
        self.profiler
            .on_property_read_pre(&self.heap, LocationId(site), &Value::Object(obj), field);
        self.heap.get(obj, field)
    }

    pub fn class(&mut self, obj: ObjectRef) -> NodeId {
        self.profiler
            .hidden_class(&self.heap, obj)
            .expect("object should be trackable")
    }

    pub fn layout(&mut self, obj: ObjectRef) -> Vec<String> {
        let node = self.class(obj);
        self.profiler.describe_layout(node)
    }
}
