//! Storage abstraction
//!
//! The planner never touches the ordered key-value store directly; it
//! consumes byte-range estimation and split-point queries through the
//! `RangeStorage` capability, and encodes scan bounds with the
//! order-preserving tuple codec. Actual range scans and point gets belong
//! to the executor.

pub mod record_codec;
pub mod tuple;

use crate::error::Result;
use async_trait::async_trait;

/// A contiguous byte-key range, `begin` inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub begin: Vec<u8>,
    pub end: Vec<u8>,
}

impl KeyRange {
    pub fn new(begin: Vec<u8>, end: Vec<u8>) -> Self {
        Self { begin, end }
    }
}

/// Server-side estimation capabilities of the ordered key-value store.
/// These are the only suspending calls on the planning path.
#[async_trait]
pub trait RangeStorage: Send + Sync {
    /// Estimated total byte size of the range `[begin, end)`.
    async fn estimated_range_size_bytes(&self, begin: &[u8], end: &[u8]) -> Result<u64>;

    /// Keys splitting `[begin, end)` into chunks of roughly
    /// `chunk_size_bytes` each. The returned points lie strictly inside the
    /// range and are sorted.
    async fn range_split_points(
        &self,
        begin: &[u8],
        end: &[u8],
        chunk_size_bytes: u64,
    ) -> Result<Vec<Vec<u8>>>;
}
