//! Structured rows: the raw text fields of one source record plus the numeric
//! features derived for it.
//!
//! Raw fields are addressed through a [`TableSchema`] shared by every row read
//! from the same file. Fields added later (backfill) and features are owned by
//! the row itself and keep their insertion order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

/// Prefix applied to feature names when a row is serialized.
pub const FEATURE_PREFIX: &str = "Feat:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("malformed row: field '{name}' is not defined by its header")]
    KeyNotFound { name: String },
    #[error("field '{name}' already exists on row")]
    DuplicateField { name: String },
    #[error("feature '{name}' already exists on row")]
    DuplicateFeature { name: String },
}

/// Column layout of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl TableSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the first name in `required` that this schema lacks.
    pub fn first_missing<'a>(&self, required: &[&'a str]) -> Option<&'a str> {
        required.iter().copied().find(|name| !self.contains(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRow {
    schema: Arc<TableSchema>,
    cells: Vec<String>,
    added_fields: Vec<(String, String)>,
    features: Vec<(String, f64)>,
    feature_index: HashMap<String, usize>,
}

impl StructuredRow {
    pub fn new(schema: Arc<TableSchema>, cells: Vec<String>) -> Self {
        Self {
            schema,
            cells,
            added_fields: Vec::new(),
            features: Vec::new(),
            feature_index: HashMap::new(),
        }
    }

    /// Builds a row with its own single-use schema. Mostly useful for tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (names, cells): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(Arc::new(TableSchema::new(names)), cells)
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Result<&str, RowError> {
        if let Some(value) = self
            .schema
            .position(name)
            .and_then(|idx| self.cells.get(idx))
        {
            return Ok(value);
        }

        self.added_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| RowError::KeyNotFound {
                name: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.contains(name) || self.added_fields.iter().any(|(field, _)| field == name)
    }

    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RowError> {
        let name = name.into();
        if self.has_field(&name) {
            return Err(RowError::DuplicateField { name });
        }
        self.added_fields.push((name, value.into()));
        Ok(())
    }

    pub fn add_feature(&mut self, name: impl Into<String>, value: f64) -> Result<(), RowError> {
        let name = name.into();
        match self.feature_index.entry(name) {
            Entry::Occupied(slot) => Err(RowError::DuplicateFeature {
                name: slot.key().clone(),
            }),
            Entry::Vacant(slot) => {
                self.features.push((slot.key().clone(), value));
                slot.insert(self.features.len() - 1);
                Ok(())
            }
        }
    }

    pub fn add_flag(&mut self, name: impl Into<String>, value: bool) -> Result<(), RowError> {
        self.add_feature(name, if value { 1.0 } else { 0.0 })
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.feature_index.get(name).map(|idx| self.features[*idx].1)
    }

    pub fn features(&self) -> &[(String, f64)] {
        &self.features
    }

    pub fn field_count(&self) -> usize {
        self.schema.len() + self.added_fields.len()
    }

    /// Field names in persisted order followed by prefixed feature names.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.field_count() + self.features.len());
        header.extend(self.schema.columns().iter().cloned());
        header.extend(self.added_fields.iter().map(|(name, _)| name.clone()));
        header.extend(
            self.features
                .iter()
                .map(|(name, _)| format!("{FEATURE_PREFIX}{name}")),
        );
        header
    }

    pub fn values(&self) -> Vec<String> {
        let mut values = Vec::with_capacity(self.field_count() + self.features.len());
        values.extend(self.cells.iter().cloned());
        values.extend(self.added_fields.iter().map(|(_, value)| value.clone()));
        values.extend(
            self.features
                .iter()
                .map(|(_, value)| render_feature_value(*value)),
        );
        values
    }
}

/// Integral values keep one decimal place (`1.0`); everything else uses the
/// shortest round-trip form.
pub fn render_feature_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
