//! Hidden-class assignment.
//!
//! Computes an object's current node in the [`TransitionTrie`] from its own
//! enumerable properties, prototype edge first, and keeps the cached node in
//! the object's [`ShadowRecord`](crate::shadow::ShadowRecord) in step with
//! writes.
//!
//! Edge labels depend only on the field name and the value currently stored
//! there: functions and prototypes are labelled by identity, every other
//! value shares one data marker.

use crate::field::{FieldId, FieldInterner};
use crate::host::{FieldSlot, HostHeap, ObjectRef, PROTO_FIELD, Value};
use crate::shadow::ShadowStore;
use crate::shape::{EdgeLabel, NodeId, TransitionTrie};
use crate::stats::ShapeStats;

/// Effect of a write on the written object's hidden class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    /// The object has no hidden class
    Untracked,
    /// A new property moved the object one edge down the trie
    Transitioned(NodeId),
    /// The write does not change the layout
    Unchanged,
    /// The label of an existing slot changed and the class was rebuilt
    Invalidated(NodeId),
}

/// A write that the host has not applied yet
#[derive(Clone, Copy)]
struct PendingWrite<'a> {
    field: &'a str,
    value: &'a Value,
}

/// Owns the transition trie and assigns hidden classes to objects.
#[derive(Debug)]
pub struct HiddenClassAssigner {
    trie: TransitionTrie,
    fields: FieldInterner,
    proto_field: FieldId,
    last_unique_id: u32,
}

impl HiddenClassAssigner {
    /// Create an assigner with an empty trie
    pub fn new() -> Self {
        let mut fields = FieldInterner::new();
        let proto_field = fields.intern(PROTO_FIELD);
        Self {
            trie: TransitionTrie::new(),
            fields,
            proto_field,
            last_unique_id: 0,
        }
    }

    /// The transition trie
    pub fn trie(&self) -> &TransitionTrie {
        &self.trie
    }

    /// Mutable access to the trie (for lazy class ids)
    pub fn trie_mut(&mut self) -> &mut TransitionTrie {
        &mut self.trie
    }

    /// Interned field names
    pub fn fields(&self) -> &FieldInterner {
        &self.fields
    }

    /// Intern a field name
    pub fn intern_field(&mut self, name: &str) -> FieldId {
        self.fields.intern(name)
    }

    /// Current hidden class of `obj`.
    ///
    /// Returns the cached node unless `force_rebuild` is set, otherwise walks
    /// the object's own fields from the root and caches the result. Objects
    /// unknown to the host have no hidden class.
    pub fn hidden_class<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        shadows: &mut ShadowStore,
        stats: &mut ShapeStats,
        obj: ObjectRef,
        force_rebuild: bool,
    ) -> Option<NodeId> {
        heap.kind_of(obj)?;
        if !force_rebuild {
            if let Some(node) = shadows.get(obj).and_then(|record| record.hidden_class) {
                return Some(node);
            }
        }
        Some(self.rebuild(heap, shadows, stats, obj, None))
    }

    /// Keep `obj`'s hidden class in step with a write that is about to happen.
    ///
    /// The caller has already excluded accessor fields.
    pub fn update_on_write<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        shadows: &mut ShadowStore,
        stats: &mut ShapeStats,
        obj: ObjectRef,
        field: &str,
        new_value: &Value,
    ) -> WriteEffect {
        let Some(current) = self.hidden_class(heap, shadows, stats, obj, false) else {
            return WriteEffect::Untracked;
        };
        let pending = PendingWrite {
            field,
            value: new_value,
        };

        if field == PROTO_FIELD && heap.own_slot(obj, field).is_none() {
            if heap.prototype_of(obj) == *new_value {
                return WriteEffect::Unchanged;
            }
            return self.invalidate(heap, shadows, stats, obj, pending);
        }

        match heap.own_slot(obj, field) {
            Some(FieldSlot::Data(old)) => {
                if self.same_label_kind(heap, &old, new_value) {
                    WriteEffect::Unchanged
                } else {
                    self.invalidate(heap, shadows, stats, obj, pending)
                }
            }
            Some(FieldSlot::Accessor) => WriteEffect::Unchanged,
            None => {
                let label = self.label_for(heap, shadows, field, new_value);
                let next = self.trie.next_child(current, label);
                stats.record_edge();
                shadows.get_or_create(obj).hidden_class = Some(next);
                WriteEffect::Transitioned(next)
            }
        }
    }

    /// Whether replacing `old` by `new` keeps the slot's edge label.
    fn same_label_kind<H: HostHeap + ?Sized>(&self, heap: &H, old: &Value, new: &Value) -> bool {
        match (heap.is_function(old), heap.is_function(new)) {
            (false, false) => true,
            (true, true) => old == new,
            _ => false,
        }
    }

    fn invalidate<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        shadows: &mut ShadowStore,
        stats: &mut ShapeStats,
        obj: ObjectRef,
        pending: PendingWrite<'_>,
    ) -> WriteEffect {
        let node = self.rebuild(heap, shadows, stats, obj, Some(pending));
        stats.record_invalidation();
        tracing::debug!(object = obj.0, field = pending.field, "hidden class invalidated");
        WriteEffect::Invalidated(node)
    }

    /// Walk `obj`'s layout from the root, as if `pending` were already applied.
    fn rebuild<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        shadows: &mut ShadowStore,
        stats: &mut ShapeStats,
        obj: ObjectRef,
        pending: Option<PendingWrite<'_>>,
    ) -> NodeId {
        let prototype = match pending {
            Some(write) if write.field == PROTO_FIELD => write.value.clone(),
            _ => heap.prototype_of(obj),
        };
        let proto_label = EdgeLabel::identity(self.proto_field, self.unique_id(shadows, &prototype));
        let mut node = self.trie.next_child(self.trie.root(), proto_label);

        heap.visit_own_fields(obj, &mut |name, slot| {
            let FieldSlot::Data(stored) = slot else {
                return;
            };
            let value = match pending {
                Some(write) if write.field == name => write.value,
                _ => stored,
            };
            let label = self.label_for(heap, shadows, name, value);
            node = self.trie.next_child(node, label);
            stats.record_edge();
        });

        shadows.get_or_create(obj).hidden_class = Some(node);
        node
    }

    /// Edge label for storing `value` under `name`.
    fn label_for<H: HostHeap + ?Sized>(
        &mut self,
        heap: &H,
        shadows: &mut ShadowStore,
        name: &str,
        value: &Value,
    ) -> EdgeLabel {
        let field = self.fields.intern(name);
        if field == self.proto_field || heap.is_function(value) {
            EdgeLabel::identity(field, self.unique_id(shadows, value))
        } else {
            EdgeLabel::data(field)
        }
    }

    /// Identity of an object value, assigned on first use; 0 for non-objects.
    fn unique_id(&mut self, shadows: &mut ShadowStore, value: &Value) -> u32 {
        let Some(obj) = value.as_object() else {
            return 0;
        };
        let record = shadows.get_or_create(obj);
        match record.unique_id {
            Some(id) => id,
            None => {
                self.last_unique_id += 1;
                record.unique_id = Some(self.last_unique_id);
                self.last_unique_id
            }
        }
    }
}

impl Default for HiddenClassAssigner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::MemoryHeap;

    struct Fixture {
        heap: MemoryHeap,
        shadows: ShadowStore,
        stats: ShapeStats,
        assigner: HiddenClassAssigner,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                heap: MemoryHeap::new(),
                shadows: ShadowStore::new(),
                stats: ShapeStats::new(),
                assigner: HiddenClassAssigner::new(),
            }
        }

        fn write(&mut self, obj: ObjectRef, field: &str, value: Value) -> WriteEffect {
            let effect = self.assigner.update_on_write(
                &self.heap,
                &mut self.shadows,
                &mut self.stats,
                obj,
                field,
                &value,
            );
            self.heap.set(obj, field, value);
            effect
        }

        fn class(&mut self, obj: ObjectRef) -> NodeId {
            self.assigner
                .hidden_class(&self.heap, &mut self.shadows, &mut self.stats, obj, false)
                .unwrap()
        }

        fn rebuilt(&mut self, obj: ObjectRef) -> NodeId {
            self.assigner
                .hidden_class(&self.heap, &mut self.shadows, &mut self.stats, obj, true)
                .unwrap()
        }
    }

    #[test]
    fn test_incremental_matches_rebuild() {
        let mut fx = Fixture::new();
        let f = fx.heap.alloc_function();
        let obj = fx.heap.alloc_object(Value::Null);
        fx.class(obj);
        fx.write(obj, "a", Value::Number(1.0));
        fx.write(obj, "m", Value::Object(f));
        fx.write(obj, "b", Value::Boolean(true));

        let incremental = fx.class(obj);
        assert_eq!(fx.rebuilt(obj), incremental);
        assert_eq!(fx.assigner.trie().layout(incremental).len(), 4);
    }

    #[test]
    fn test_new_field_transitions() {
        let mut fx = Fixture::new();
        let obj = fx.heap.alloc_object(Value::Null);
        let before = fx.class(obj);
        let effect = fx.write(obj, "x", Value::Number(1.0));

        let WriteEffect::Transitioned(after) = effect else {
            panic!("expected transition, got {effect:?}");
        };
        assert_eq!(fx.assigner.trie().node(after).parent, Some(before));
    }

    #[test]
    fn test_data_overwrite_keeps_class() {
        let mut fx = Fixture::new();
        let obj = fx.heap.alloc_object(Value::Null);
        fx.write(obj, "x", Value::Number(1.0));
        let before = fx.class(obj);

        assert_eq!(fx.write(obj, "x", Value::string("s")), WriteEffect::Unchanged);
        assert_eq!(fx.class(obj), before);
    }

    #[test]
    fn test_function_over_data_invalidates() {
        let mut fx = Fixture::new();
        let f = fx.heap.alloc_function();
        let obj = fx.heap.alloc_object(Value::Null);
        fx.write(obj, "x", Value::Number(1.0));
        let before = fx.class(obj);

        let effect = fx.write(obj, "x", Value::Object(f));
        assert!(matches!(effect, WriteEffect::Invalidated(node) if node != before));
        assert_eq!(fx.stats.invalidations, 1);

        // The rebuilt class already reflects the new value.
        let after = fx.class(obj);
        assert_eq!(fx.rebuilt(obj), after);
    }

    #[test]
    fn test_same_function_is_unchanged() {
        let mut fx = Fixture::new();
        let f = fx.heap.alloc_function();
        let g = fx.heap.alloc_function();
        let obj = fx.heap.alloc_object(Value::Null);
        fx.write(obj, "m", Value::Object(f));

        assert_eq!(fx.write(obj, "m", Value::Object(f)), WriteEffect::Unchanged);
        assert!(matches!(fx.write(obj, "m", Value::Object(g)), WriteEffect::Invalidated(_)));
    }

    #[test]
    fn test_prototype_swap_invalidates() {
        let mut fx = Fixture::new();
        let p1 = fx.heap.alloc_object(Value::Null);
        let p2 = fx.heap.alloc_object(Value::Null);
        let obj = fx.heap.alloc_object(Value::Object(p1));
        let before = fx.class(obj);

        assert_eq!(fx.write(obj, PROTO_FIELD, Value::Object(p1)), WriteEffect::Unchanged);
        let effect = fx.write(obj, PROTO_FIELD, Value::Object(p2));
        assert!(matches!(effect, WriteEffect::Invalidated(node) if node != before));
    }

    #[test]
    fn test_accessor_fields_do_not_shape() {
        let mut fx = Fixture::new();
        let plain = fx.heap.alloc_object(Value::Null);
        let with_getter = fx.heap.alloc_object(Value::Null);
        fx.heap.define_accessor(with_getter, "g");

        assert_eq!(fx.class(plain), fx.class(with_getter));
    }

    #[test]
    fn test_unknown_object_has_no_class() {
        let mut fx = Fixture::new();
        let class = fx.assigner.hidden_class(
            &fx.heap,
            &mut fx.shadows,
            &mut fx.stats,
            ObjectRef(99),
            false,
        );
        assert_eq!(class, None);
    }

    #[test]
    fn test_unique_ids_start_at_one() {
        let mut fx = Fixture::new();
        let proto = fx.heap.alloc_object(Value::Null);
        let obj = fx.heap.alloc_object(Value::Object(proto));
        let node = fx.class(obj);

        let layout = fx
            .assigner
            .trie()
            .describe_layout(node, fx.assigner.fields());
        assert_eq!(layout, "__proto__:f1|");
        assert_eq!(fx.shadows.get(proto).unwrap().unique_id, Some(1));
    }
}
