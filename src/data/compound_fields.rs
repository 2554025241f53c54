//! Virtual fields derived from several row fields
//!
//! A compound field is registered once under a name and can then be used
//! anywhere a field name is expected for sorting, column filters and the
//! global search.

use anyhow::{bail, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::data::record::{display_value, Record};

/// Combines the source field values (in declaration order) into one value
pub type Combiner = Arc<dyn Fn(&[Option<Value>]) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct CompoundField {
    pub name: String,
    pub source_fields: Vec<String>,
    combine: Combiner,
}

impl CompoundField {
    pub fn new<F>(name: impl Into<String>, source_fields: Vec<String>, combine: F) -> Self
    where
        F: Fn(&[Option<Value>]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source_fields,
            combine: Arc::new(combine),
        }
    }

    /// String concatenation of the source fields with a separator.
    /// Missing fields contribute an empty string.
    pub fn joined(name: impl Into<String>, source_fields: &[&str], separator: &str) -> Self {
        let separator = separator.to_string();
        Self::new(
            name,
            source_fields.iter().map(|s| s.to_string()).collect(),
            move |values| {
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| v.as_ref().and_then(display_value).unwrap_or_default())
                    .collect();
                Value::String(parts.join(&separator))
            },
        )
    }

    pub fn resolve<R: Record>(&self, row: &R) -> Value {
        let values: Vec<Option<Value>> = self
            .source_fields
            .iter()
            .map(|field| row.field(field))
            .collect();
        (self.combine)(&values)
    }
}

impl fmt::Debug for CompoundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundField")
            .field("name", &self.name)
            .field("source_fields", &self.source_fields)
            .finish()
    }
}

/// Registry of compound fields owned by one view
#[derive(Clone, Debug, Default)]
pub struct CompoundFields {
    fields: BTreeMap<String, CompoundField>,
}

impl CompoundFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compound field. A name can only be registered once.
    pub fn register(&mut self, field: CompoundField) -> Result<()> {
        if self.fields.contains_key(&field.name) {
            bail!("Compound field '{}' is already registered", field.name);
        }
        debug!(target: "sort", "Registered compound field {} from {:?}", field.name, field.source_fields);
        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn with(mut self, field: CompoundField) -> Result<Self> {
        self.register(field)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&CompoundField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Value of `name` for `row`: the compound value if `name` is registered,
    /// otherwise the row's own field.
    pub fn resolve_field<R: Record>(&self, row: &R, name: &str) -> Option<Value> {
        match self.fields.get(name) {
            Some(compound) => Some(compound.resolve(row)),
            None => row.field(name),
        }
    }

    /// All compound values of a row, for the global search
    pub fn values<R: Record>(&self, row: &R) -> Vec<Value> {
        self.fields.values().map(|c| c.resolve(row)).collect()
    }
}
