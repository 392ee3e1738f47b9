//! Host reflection interface.
//!
//! The profiler never owns target-program objects. It sees them through
//! [`ObjectRef`] identity handles and asks the host about their layout via
//! [`HostHeap`]. Every event is classified once into a [`Capability`] before
//! any shape work is done.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Name of the synthetic prototype field.
pub const PROTO_FIELD: &str = "__proto__";

/// Name of the variable that holds the arguments object.
pub const ARGUMENTS_NAME: &str = "arguments";

/// Opaque identity of a host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u64);

/// Opaque identifier of a source operation (call-site or allocation site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocationId(pub u32);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iid{}", self.0)
    }
}

/// A target-program value as seen by the profiler.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Boolean(bool),
    /// Number primitive
    Number(f64),
    /// String primitive
    String(Arc<str>),
    /// Heap object (plain object, function, array, ...)
    Object(ObjectRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    /// The object identity, if this is an object value
    #[inline]
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Host-level kind of a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Ordinary object with a tracked layout
    Ordinary,
    /// Callable object
    Function,
    /// Plain numeric-indexed array
    Array,
    /// Typed array or array buffer
    TypedArray,
    /// Boxed string
    StringWrapper,
}

/// An own property slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSlot {
    /// Data property holding a value
    Data(Value),
    /// Getter and/or setter
    Accessor,
}

/// Read-only reflection over the host's object graph.
///
/// All calls are synchronous and must not re-enter the profiler.
pub trait HostHeap {
    /// Kind of a live object, `None` if the host does not know it.
    fn kind_of(&self, obj: ObjectRef) -> Option<ObjectKind>;

    /// The object's prototype (`Null` when it has none).
    fn prototype_of(&self, obj: ObjectRef) -> Value;

    /// The own slot for `field`, if the object has one.
    fn own_slot(&self, obj: ObjectRef, field: &str) -> Option<FieldSlot>;

    /// Whether `field` resolves to an accessor on the object or its prototype chain.
    fn has_accessor(&self, obj: ObjectRef, field: &str) -> bool;

    /// Visit own enumerable properties in insertion order.
    fn visit_own_fields(&self, obj: ObjectRef, visitor: &mut dyn FnMut(&str, &FieldSlot));

    /// Whether `value` is callable.
    fn is_function(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => self.kind_of(*obj) == Some(ObjectKind::Function),
            _ => false,
        }
    }
}

/// How an access base participates in shape tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Object whose layout is simulated
    Trackable(ObjectRef),
    /// Arrays, typed arrays and arguments objects take a different fast path
    ArrayLike,
    /// String primitives and boxed strings
    StringLike,
    /// The accessed field is a getter/setter
    Accessor,
    /// Other primitives, or objects unknown to the host
    Primitive,
}

impl Capability {
    /// Classify a base value, ignoring the accessed field.
    ///
    /// `arguments_like` reports whether the profiler has flagged the object
    /// as an arguments object.
    pub fn of_base<H: HostHeap + ?Sized>(
        heap: &H,
        base: &Value,
        arguments_like: impl FnOnce(ObjectRef) -> bool,
    ) -> Self {
        match base {
            Value::String(_) => Capability::StringLike,
            Value::Object(obj) => match heap.kind_of(*obj) {
                None => Capability::Primitive,
                Some(ObjectKind::StringWrapper) => Capability::StringLike,
                Some(ObjectKind::Array | ObjectKind::TypedArray) => Capability::ArrayLike,
                Some(ObjectKind::Ordinary | ObjectKind::Function) => {
                    if arguments_like(*obj) {
                        Capability::ArrayLike
                    } else {
                        Capability::Trackable(*obj)
                    }
                }
            },
            _ => Capability::Primitive,
        }
    }

    /// Classify a base value for an access to `field`.
    pub fn of_access<H: HostHeap + ?Sized>(
        heap: &H,
        base: &Value,
        field: &str,
        arguments_like: impl FnOnce(ObjectRef) -> bool,
    ) -> Self {
        match Self::of_base(heap, base, arguments_like) {
            Capability::Trackable(obj) if heap.has_accessor(obj, field) => Capability::Accessor,
            other => other,
        }
    }

    /// The tracked object, if any
    #[inline]
    pub fn trackable(self) -> Option<ObjectRef> {
        match self {
            Capability::Trackable(obj) => Some(obj),
            _ => None,
        }
    }
}
