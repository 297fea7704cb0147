//! Core data types for the planner

mod spatial;
mod timestamp;
mod value;

pub use spatial::{polygon_bounds, polygon_contains, BoundingBox, GeoPoint};
pub use timestamp::Timestamp;
pub use value::{Value, ValueKind};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A materialized record: field name to value.
pub type Record = HashMap<String, Value>;

/// Record identifier (unique within a record type)
pub type RecordId = u64;

/// Sort direction for a sort descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_descending(self) -> bool {
        matches!(self, SortDirection::Descending)
    }
}

/// A single requested ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub field: String,
    pub direction: SortDirection,
}

impl SortDescriptor {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}
