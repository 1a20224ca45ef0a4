use serde::{Deserialize, Serialize};

use bluecrab_types::MAX_SCHEMA_FIELDS;

/// Ordered, bounded list of field names declared by a schema file.
///
/// Capacity is [`MAX_SCHEMA_FIELDS`]; pushes beyond it are refused.
/// Duplicate names are allowed and [`position`](Schema::position) resolves
/// to the first occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared field names.
    pub fn field_count(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The declared names, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of the first field with this exact name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Append a field name. Returns `false` if the schema is at capacity.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        if self.names.len() >= MAX_SCHEMA_FIELDS {
            return false;
        }
        self.names.push(name.into());
        true
    }

    /// Remove all declared names.
    pub fn clear(&mut self) {
        self.names.clear();
    }
}
