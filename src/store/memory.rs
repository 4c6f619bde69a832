use std::collections::HashMap;

use crate::genomics::{AlignmentRecord, GenomicRange};
use crate::store::{AlignmentStore, RecordStream, StoreError};

/// Alignment store held entirely in memory.
///
/// Records are returned in insertion order. Records with non-positive
/// coordinates are kept and handed out whenever their raw span touches the
/// query, so consumers see them the way a lenient file reader would.
#[derive(Debug, Default, Clone)]
pub struct MemoryAlignmentStore {
    references: Vec<(String, u32)>,
    records: HashMap<String, Vec<AlignmentRecord>>,
}

impl MemoryAlignmentStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a reference sequence.
    pub fn add_reference(&mut self, name: impl Into<String>, length: u32) {
        let name = name.into();
        self.records.entry(name.clone()).or_default();
        self.references.push((name, length));
    }

    /// Append a record to `reference`, declaring it with an unbounded
    /// length if unknown.
    pub fn push(&mut self, reference: &str, record: AlignmentRecord) {
        if !self.records.contains_key(reference) {
            self.add_reference(reference, u32::MAX);
        }
        if let Some(records) = self.records.get_mut(reference) {
            records.push(record);
        }
    }
}

impl AlignmentStore for MemoryAlignmentStore {
    fn reference_names(&self) -> Vec<String> {
        self.references.iter().map(|(name, _)| name.clone()).collect()
    }

    fn reference_length(&self, reference: &str) -> Option<u32> {
        self.references
            .iter()
            .find(|(name, _)| name == reference)
            .map(|(_, len)| *len)
    }

    fn query_overlapping<'a>(
        &'a mut self,
        reference: &str,
        range: GenomicRange,
    ) -> Result<RecordStream<'a>, StoreError> {
        let records = self
            .records
            .get(reference)
            .ok_or_else(|| format!("unknown reference {reference}"))?;
        let (lo, hi) = (i64::from(range.start()), i64::from(range.end()));
        Ok(Box::new(
            records
                .iter()
                .filter(move |r| r.start <= hi && r.end >= lo)
                .cloned()
                .map(Ok),
        ))
    }
}
