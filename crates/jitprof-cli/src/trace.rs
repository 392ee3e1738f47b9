//! Recorded event traces.
//!
//! A trace is JSON lines, one host event per line:
//!
//! ```text
//! {"op":"alloc","id":"p","site":1}
//! {"op":"alloc","id":"o","proto":"p","site":2}
//! {"op":"put","site":3,"base":{"ref":"o"},"field":"a","value":1}
//! {"op":"get","site":4,"base":{"ref":"o"},"field":"a"}
//! {"op":"end"}
//! ```
//!
//! The replayer keeps a [`MemoryHeap`] in step with the trace and calls the
//! profiler before applying each operation, like an instrumented host would.

use jitprof_core::{LocationId, MemoryHeap, ObjectKind, ObjectRef, ShapeProfiler, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use thiserror::Error;

/// Errors for a single trace line. Replay logs them and moves on.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The line is not a valid event
    #[error("line {line}: invalid event: {source}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// The event names an object that was never allocated
    #[error("line {line}: unknown object `{id}`")]
    UnknownObject {
        /// 1-based line number
        line: usize,
        /// Trace-level object name
        id: String,
    },

    /// The event reuses an object name
    #[error("line {line}: object `{id}` allocated twice")]
    DuplicateObject {
        /// 1-based line number
        line: usize,
        /// Trace-level object name
        id: String,
    },
}

/// Object kind as written in a trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Ordinary object
    #[default]
    Object,
    /// Function
    Function,
    /// Plain array
    Array,
    /// Typed array or array buffer
    TypedArray,
    /// Boxed string
    String,
}

impl From<TraceKind> for ObjectKind {
    fn from(kind: TraceKind) -> Self {
        match kind {
            TraceKind::Object => ObjectKind::Ordinary,
            TraceKind::Function => ObjectKind::Function,
            TraceKind::Array => ObjectKind::Array,
            TraceKind::TypedArray => ObjectKind::TypedArray,
            TraceKind::String => ObjectKind::StringWrapper,
        }
    }
}

/// Value as written in a trace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraceValue {
    /// Reference to an allocated object
    Ref {
        /// Object name
        #[serde(rename = "ref")]
        id: String,
    },
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    Text(String),
}

/// Field key as written in a trace; computed numeric keys are allowed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TraceField {
    /// Named property
    Name(String),
    /// Computed numeric key
    Number(f64),
}

impl TraceField {
    /// Property key the number converts to: `1.0` is `"1"`, `-0.0` is `"0"`.
    fn as_key(&self) -> String {
        match self {
            TraceField::Name(name) => name.clone(),
            TraceField::Number(n) if *n == 0.0 => "0".to_string(),
            TraceField::Number(n) => n.to_string(),
        }
    }
}

/// One host event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Object or function creation
    Alloc {
        /// Name used by later events
        id: String,
        /// Object kind
        #[serde(default)]
        kind: TraceKind,
        /// Prototype object name
        #[serde(default)]
        proto: Option<String>,
        /// Allocation site; unstamped when absent
        #[serde(default)]
        site: Option<u32>,
    },
    /// Property write
    Put {
        /// Write site
        site: u32,
        /// Base value
        base: TraceValue,
        /// Field written
        field: TraceField,
        /// Value written (`null` when absent)
        #[serde(default)]
        value: Option<TraceValue>,
    },
    /// Property read
    Get {
        /// Read site
        site: u32,
        /// Base value
        base: TraceValue,
        /// Field read
        field: TraceField,
    },
    /// Define a getter/setter
    Accessor {
        /// Object name
        object: String,
        /// Field
        field: TraceField,
    },
    /// Variable read
    Var {
        /// Variable name
        name: String,
        /// Value read
        #[serde(default)]
        value: Option<TraceValue>,
    },
    /// End of execution
    End,
}

/// Outcome of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading
    Continue,
    /// The trace signalled end of execution
    End,
}

/// Summary of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events applied
    pub events: usize,
    /// Lines skipped because of errors
    pub skipped: usize,
}

/// Feeds trace events to a [`ShapeProfiler`] over a [`MemoryHeap`].
#[derive(Debug, Default)]
pub struct Replayer {
    heap: MemoryHeap,
    objects: HashMap<String, ObjectRef>,
    profiler: ShapeProfiler,
}

impl Replayer {
    /// Create a replayer around `profiler`
    pub fn new(profiler: ShapeProfiler) -> Self {
        Self {
            profiler,
            ..Self::default()
        }
    }

    /// The profiler
    pub fn profiler(&self) -> &ShapeProfiler {
        &self.profiler
    }

    /// Replay every line of `reader` until `end` or end of input.
    pub fn replay<R: BufRead>(&mut self, reader: R) -> std::io::Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match self.apply_line(index + 1, trimmed) {
                Ok(Step::Continue) => summary.events += 1,
                Ok(Step::End) => {
                    summary.events += 1;
                    break;
                }
                Err(err) => {
                    tracing::warn!("{}", err);
                    summary.skipped += 1;
                }
            }
        }
        tracing::debug!(events = summary.events, skipped = summary.skipped, "replay finished");
        Ok(summary)
    }

    /// Parse and apply one line
    pub fn apply_line(&mut self, line: usize, text: &str) -> Result<Step, TraceError> {
        let event: TraceEvent =
            serde_json::from_str(text).map_err(|source| TraceError::Parse { line, source })?;
        self.apply(line, event)
    }

    /// Apply one event: profiler callback first, then the heap mutation.
    pub fn apply(&mut self, line: usize, event: TraceEvent) -> Result<Step, TraceError> {
        match event {
            TraceEvent::Alloc {
                id,
                kind,
                proto,
                site,
            } => {
                if self.objects.contains_key(&id) {
                    return Err(TraceError::DuplicateObject { line, id });
                }
                let prototype = match proto {
                    Some(proto) => Value::Object(self.object(line, &proto)?),
                    None => Value::Null,
                };
                let obj = self.heap.alloc(kind.into(), prototype);
                self.objects.insert(id, obj);
                if let Some(site) = site {
                    self.profiler
                        .on_object_created(&self.heap, LocationId(site), &Value::Object(obj));
                }
            }
            TraceEvent::Put {
                site,
                base,
                field,
                value,
            } => {
                let base = self.value(line, &base)?;
                let value = self.optional_value(line, value.as_ref())?;
                let field = field.as_key();
                self.profiler
                    .on_property_write_pre(&self.heap, LocationId(site), &base, &field, &value);
                if let Some(obj) = base.as_object() {
                    self.heap.set(obj, &field, value);
                }
            }
            TraceEvent::Get { site, base, field } => {
                let base = self.value(line, &base)?;
                self.profiler
                    .on_property_read_pre(&self.heap, LocationId(site), &base, &field.as_key());
            }
            TraceEvent::Accessor { object, field } => {
                let obj = self.object(line, &object)?;
                self.heap.define_accessor(obj, &field.as_key());
            }
            TraceEvent::Var { name, value } => {
                let value = self.optional_value(line, value.as_ref())?;
                self.profiler.on_variable_read(&name, &value);
            }
            TraceEvent::End => return Ok(Step::End),
        }
        Ok(Step::Continue)
    }

    fn object(&self, line: usize, id: &str) -> Result<ObjectRef, TraceError> {
        self.objects
            .get(id)
            .copied()
            .ok_or_else(|| TraceError::UnknownObject {
                line,
                id: id.to_string(),
            })
    }

    fn value(&self, line: usize, value: &TraceValue) -> Result<Value, TraceError> {
        Ok(match value {
            TraceValue::Ref { id } => Value::Object(self.object(line, id)?),
            TraceValue::Null => Value::Null,
            TraceValue::Bool(b) => Value::Boolean(*b),
            TraceValue::Number(n) => Value::Number(*n),
            TraceValue::Text(s) => Value::string(s),
        })
    }

    fn optional_value(&self, line: usize, value: Option<&TraceValue>) -> Result<Value, TraceError> {
        match value {
            Some(value) => self.value(line, value),
            None => Ok(Value::Null),
        }
    }
}
