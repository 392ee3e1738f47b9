//! In-memory reference host.
//!
//! `MemoryHeap` is a minimal object model (ordered own properties, data and
//! accessor slots, prototypes) used to drive the profiler from recorded
//! traces and from tests. Mutations are applied by the caller *after* the
//! matching `*_pre` callback has run.

use crate::host::{FieldSlot, HostHeap, ObjectKind, ObjectRef, PROTO_FIELD, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// A heap object
#[derive(Debug, Clone)]
struct HeapObject {
    kind: ObjectKind,
    prototype: Value,
    /// Own properties in insertion order
    properties: IndexMap<Arc<str>, FieldSlot>,
}

/// In-memory object graph implementing [`HostHeap`].
#[derive(Debug, Default, Clone)]
pub struct MemoryHeap {
    objects: Vec<HeapObject>,
}

impl MemoryHeap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object of the given kind
    pub fn alloc(&mut self, kind: ObjectKind, prototype: Value) -> ObjectRef {
        let obj = ObjectRef(self.objects.len() as u64);
        self.objects.push(HeapObject {
            kind,
            prototype,
            properties: IndexMap::new(),
        });
        obj
    }

    /// Allocate an ordinary object
    pub fn alloc_object(&mut self, prototype: Value) -> ObjectRef {
        self.alloc(ObjectKind::Ordinary, prototype)
    }

    /// Allocate a function object
    pub fn alloc_function(&mut self) -> ObjectRef {
        self.alloc(ObjectKind::Function, Value::Null)
    }

    /// Number of allocated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the heap has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn object(&self, obj: ObjectRef) -> Option<&HeapObject> {
        self.objects.get(obj.0 as usize)
    }

    fn object_mut(&mut self, obj: ObjectRef) -> Option<&mut HeapObject> {
        self.objects.get_mut(obj.0 as usize)
    }

    /// Store a data property. Writing `__proto__` replaces the prototype.
    ///
    /// Returns false if the object is unknown or the field resolves to an
    /// accessor, own or inherited. The setter is not modeled, so no own
    /// property is created in that case.
    pub fn set(&mut self, obj: ObjectRef, field: &str, value: Value) -> bool {
        if field != PROTO_FIELD && self.has_accessor(obj, field) {
            return false;
        }
        let Some(object) = self.object_mut(obj) else {
            return false;
        };
        if field == PROTO_FIELD {
            object.prototype = value;
            return true;
        }
        match object.properties.get_mut(field) {
            Some(slot) => *slot = FieldSlot::Data(value),
            None => {
                object
                    .properties
                    .insert(Arc::from(field), FieldSlot::Data(value));
            }
        }
        true
    }

    /// Define (or redefine) an own accessor property
    pub fn define_accessor(&mut self, obj: ObjectRef, field: &str) -> bool {
        let Some(object) = self.object_mut(obj) else {
            return false;
        };
        match object.properties.get_mut(field) {
            Some(slot) => *slot = FieldSlot::Accessor,
            None => {
                object.properties.insert(Arc::from(field), FieldSlot::Accessor);
            }
        }
        true
    }

    /// Read a data property, following the prototype chain
    pub fn get(&self, obj: ObjectRef, field: &str) -> Option<Value> {
        let mut current = Some(obj);
        // Bounded walk; prototype cycles are possible in a hand-written trace.
        for _ in 0..=self.objects.len() {
            let object = self.object(current?)?;
            if field == PROTO_FIELD {
                return Some(object.prototype.clone());
            }
            match object.properties.get(field) {
                Some(FieldSlot::Data(value)) => return Some(value.clone()),
                Some(FieldSlot::Accessor) => return None,
                None => current = object.prototype.as_object(),
            }
        }
        None
    }
}

impl HostHeap for MemoryHeap {
    fn kind_of(&self, obj: ObjectRef) -> Option<ObjectKind> {
        self.object(obj).map(|object| object.kind)
    }

    fn prototype_of(&self, obj: ObjectRef) -> Value {
        self.object(obj)
            .map(|object| object.prototype.clone())
            .unwrap_or(Value::Null)
    }

    fn own_slot(&self, obj: ObjectRef, field: &str) -> Option<FieldSlot> {
        self.object(obj)?.properties.get(field).cloned()
    }

    fn has_accessor(&self, obj: ObjectRef, field: &str) -> bool {
        let mut current = Some(obj);
        for _ in 0..=self.objects.len() {
            let Some(object) = current.and_then(|obj| self.object(obj)) else {
                return false;
            };
            match object.properties.get(field) {
                Some(FieldSlot::Accessor) => return true,
                Some(FieldSlot::Data(_)) => return false,
                None => current = object.prototype.as_object(),
            }
        }
        false
    }

    fn visit_own_fields(&self, obj: ObjectRef, visitor: &mut dyn FnMut(&str, &FieldSlot)) {
        if let Some(object) = self.object(obj) {
            for (name, slot) in &object.properties {
                visitor(name, slot);
            }
        }
    }
}
