//! Record type and index metadata
//!
//! The catalog is the planner's view of the schema: record types, their
//! fields, and the secondary indexes defined over them. Registration and
//! maintenance of the underlying structures happen elsewhere; the catalog
//! only answers planning lookups and drives cached-plan invalidation when
//! an index is dropped.

use crate::error::{PlannerError, Result};
use crate::types::ValueKind;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Field data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Integer,
    Double,
    Text,
    Bytes,
    Timestamp,
    /// Embedding vector with fixed dimension
    Vector(usize),
    /// Geographic point
    Geo,
}

impl FieldType {
    /// Kind used by the record codec when decoding covering index payloads.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            FieldType::Bool => ValueKind::Bool,
            FieldType::Integer | FieldType::Double => ValueKind::Numeric,
            FieldType::Text => ValueKind::Text,
            FieldType::Timestamp => ValueKind::Timestamp,
            FieldType::Bytes | FieldType::Vector(_) | FieldType::Geo => ValueKind::Bytes,
        }
    }
}

/// Field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Index kind, selecting the planning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Ordered B-tree over one or more scalar key columns
    Scalar,
    /// Inverted full-text index
    FullText,
    /// Approximate nearest-neighbor vector index
    Vector,
    /// R-tree style spatial index
    Spatial,
}

impl IndexKind {
    pub fn name(self) -> &'static str {
        match self {
            IndexKind::Scalar => "scalar",
            IndexKind::FullText => "full_text",
            IndexKind::Vector => "vector",
            IndexKind::Spatial => "spatial",
        }
    }
}

/// Secondary index descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name (unique per catalog)
    pub name: String,
    /// Kind identifier selecting the planning strategy
    pub kind: IndexKind,
    /// Key columns, in key order
    pub key_paths: Vec<String>,
    /// Payload columns available without a record fetch
    pub stored_key_paths: Vec<String>,
    /// At most one entry per key
    pub is_unique: bool,
}

impl IndexDescriptor {
    pub fn scalar(name: impl Into<String>, key_paths: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Scalar,
            key_paths,
            stored_key_paths: Vec::new(),
            is_unique: false,
        }
    }

    pub fn full_text(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::FullText,
            key_paths: vec![field.into()],
            stored_key_paths: Vec::new(),
            is_unique: false,
        }
    }

    pub fn vector(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Vector,
            key_paths: vec![field.into()],
            stored_key_paths: Vec::new(),
            is_unique: false,
        }
    }

    pub fn spatial(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: IndexKind::Spatial,
            key_paths: vec![field.into()],
            stored_key_paths: Vec::new(),
            is_unique: false,
        }
    }

    pub fn with_stored(mut self, stored: Vec<String>) -> Self {
        self.stored_key_paths = stored;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// First key column, if any.
    pub fn leading_key(&self) -> Option<&str> {
        self.key_paths.first().map(String::as_str)
    }

    /// Union of key and stored columns.
    pub fn available_fields(&self) -> BTreeSet<&str> {
        self.key_paths
            .iter()
            .chain(self.stored_key_paths.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Record type schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSchema {
    pub type_name: String,
    pub fields: Vec<FieldDef>,
    pub indexes: Vec<IndexDescriptor>,
    pub primary_key: Option<String>,
}

impl RecordSchema {
    pub fn new(type_name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            indexes: Vec::new(),
            primary_key: None,
        }
    }

    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> BTreeSet<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Field name/kind pairs for the record codec.
    pub fn codec_fields(&self) -> Vec<(String, ValueKind)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.field_type.value_kind()))
            .collect()
    }

    /// Whether the index's key and stored columns contain every field of the
    /// type, making an index-only scan possible. Index entries always carry
    /// the primary key, so it counts as available.
    pub fn index_covers(&self, index: &IndexDescriptor) -> bool {
        let mut available = index.available_fields();
        if let Some(pk) = &self.primary_key {
            available.insert(pk.as_str());
        }
        self.fields.iter().all(|f| available.contains(f.name.as_str()))
    }
}

/// Thread-safe schema catalog
pub struct RecordCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Default)]
struct CatalogInner {
    /// Type name -> schema
    types: HashMap<String, RecordSchema>,
    /// Index name -> owning type name
    index_owner: HashMap<String, String>,
}

impl Default for RecordCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner::default()),
        }
    }

    /// Register a record type, including its indexes.
    pub fn register_type(&self, schema: RecordSchema) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.types.contains_key(&schema.type_name) {
            return Err(PlannerError::invalid_query(format!(
                "record type '{}' already registered",
                schema.type_name
            )));
        }
        for index in &schema.indexes {
            if inner.index_owner.contains_key(&index.name) {
                return Err(PlannerError::invalid_query(format!(
                    "index '{}' already exists",
                    index.name
                )));
            }
        }
        for index in &schema.indexes {
            inner
                .index_owner
                .insert(index.name.clone(), schema.type_name.clone());
        }
        inner.types.insert(schema.type_name.clone(), schema);
        Ok(())
    }

    pub fn drop_type(&self, type_name: &str) -> Result<RecordSchema> {
        let mut inner = self.inner.write();
        let schema = inner
            .types
            .remove(type_name)
            .ok_or_else(|| PlannerError::TypeNotFound(type_name.to_string()))?;
        for index in &schema.indexes {
            inner.index_owner.remove(&index.name);
        }
        Ok(schema)
    }

    pub fn schema(&self, type_name: &str) -> Result<RecordSchema> {
        self.inner
            .read()
            .types
            .get(type_name)
            .cloned()
            .ok_or_else(|| PlannerError::TypeNotFound(type_name.to_string()))
    }

    pub fn type_exists(&self, type_name: &str) -> bool {
        self.inner.read().types.contains_key(type_name)
    }

    pub fn list_types(&self) -> Vec<String> {
        self.inner.read().types.keys().cloned().collect()
    }

    /// Add an index to a registered type.
    pub fn add_index(&self, type_name: &str, index: IndexDescriptor) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.index_owner.contains_key(&index.name) {
            return Err(PlannerError::invalid_query(format!(
                "index '{}' already exists",
                index.name
            )));
        }
        let schema = inner
            .types
            .get(type_name)
            .ok_or_else(|| PlannerError::TypeNotFound(type_name.to_string()))?;
        for key in index.key_paths.iter().chain(&index.stored_key_paths) {
            if !schema.has_field(key) {
                return Err(PlannerError::invalid_query(format!(
                    "index '{}' references unknown field '{}'",
                    index.name, key
                )));
            }
        }
        inner
            .index_owner
            .insert(index.name.clone(), type_name.to_string());
        if let Some(schema) = inner.types.get_mut(type_name) {
            schema.indexes.push(index);
        }
        Ok(())
    }

    /// Drop an index, returning its descriptor so callers can invalidate
    /// dependent cached plans.
    pub fn drop_index(&self, index_name: &str) -> Result<IndexDescriptor> {
        let mut inner = self.inner.write();
        let owner = inner
            .index_owner
            .remove(index_name)
            .ok_or_else(|| PlannerError::IndexNotFound(index_name.to_string()))?;
        let schema = inner
            .types
            .get_mut(&owner)
            .ok_or_else(|| PlannerError::TypeNotFound(owner.clone()))?;
        let pos = schema
            .indexes
            .iter()
            .position(|i| i.name == index_name)
            .ok_or_else(|| PlannerError::IndexNotFound(index_name.to_string()))?;
        Ok(schema.indexes.remove(pos))
    }

    pub fn index(&self, index_name: &str) -> Result<IndexDescriptor> {
        let inner = self.inner.read();
        let owner = inner
            .index_owner
            .get(index_name)
            .ok_or_else(|| PlannerError::IndexNotFound(index_name.to_string()))?;
        inner
            .types
            .get(owner)
            .and_then(|s| s.indexes.iter().find(|i| i.name == index_name))
            .cloned()
            .ok_or_else(|| PlannerError::IndexNotFound(index_name.to_string()))
    }

    pub fn index_exists(&self, index_name: &str) -> bool {
        self.inner.read().index_owner.contains_key(index_name)
    }
}
