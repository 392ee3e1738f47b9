//! Field name interning.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Dense id of an interned field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

/// Maps field names to [`FieldId`]s and back.
///
/// Lookups by `&str` do not allocate once a name has been seen.
#[derive(Debug, Default)]
pub struct FieldInterner {
    ids: FxHashMap<Arc<str>, FieldId>,
    names: Vec<Arc<str>>,
}

impl FieldInterner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning its id
    pub fn intern(&mut self, name: &str) -> FieldId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = FieldId(self.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        self.ids.insert(name, id);
        id
    }

    /// Name of an interned id
    pub fn name(&self, id: FieldId) -> &str {
        self.names.get(id.0 as usize).map(|s| &**s).unwrap_or("")
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
