use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rust_htslib::bam::{self, record::Record, Read};
use tracing::info;

use crate::genomics::{AlignmentRecord, GenomicRange, Strand};
use crate::store::{AlignmentStore, RecordStream, StoreError};
use crate::{AnnotationError, Result};

/// Indexed BAM file read through htslib.
///
/// Converts htslib's 0-based half-open coordinates to 1-based inclusive
/// [`AlignmentRecord`]s. Unmapped records come out with zero coordinates.
pub struct BamAlignmentStore {
    reader: bam::IndexedReader,
    names: Vec<String>,
    lengths: HashMap<String, u32>,
}

impl std::fmt::Debug for BamAlignmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BamAlignmentStore")
            .field("references", &self.names.len())
            .finish()
    }
}

impl BamAlignmentStore {
    /// Open `bam_path` with its index at `index_path`, or `<bam_path>.bai`.
    pub fn open(bam_path: impl AsRef<Path>, index_path: Option<&Path>) -> Result<Self> {
        let bam_path = bam_path.as_ref();
        let index_path: PathBuf = match index_path {
            Some(path) => path.to_path_buf(),
            None => {
                let mut raw = bam_path.as_os_str().to_owned();
                raw.push(".bai");
                PathBuf::from(raw)
            }
        };

        let reader = bam::IndexedReader::from_path_and_index(bam_path, index_path.as_path())
            .map_err(|err| {
                AnnotationError::configuration(format!(
                    "cannot open {} with index {}: {err}",
                    bam_path.display(),
                    index_path.display()
                ))
            })?;

        let header = reader.header();
        let mut names = Vec::with_capacity(header.target_count() as usize);
        let mut lengths = HashMap::with_capacity(names.capacity());
        for tid in 0..header.target_count() {
            let name = String::from_utf8_lossy(header.tid2name(tid)).into_owned();
            let length = header
                .target_len(tid)
                .map(|len| len.min(u64::from(u32::MAX)) as u32)
                .unwrap_or(u32::MAX);
            lengths.insert(name.clone(), length);
            names.push(name);
        }
        info!(
            path = %bam_path.display(),
            references = names.len(),
            "opened indexed BAM"
        );

        Ok(Self {
            reader,
            names,
            lengths,
        })
    }
}

fn convert(record: &Record) -> AlignmentRecord {
    let (start, end) = if record.is_unmapped() {
        (0, 0)
    } else {
        (record.pos() + 1, record.cigar().end_pos())
    };
    AlignmentRecord {
        read_name: Arc::from(String::from_utf8_lossy(record.qname()).as_ref()),
        start,
        end,
        strand: if record.is_reverse() {
            Strand::Negative
        } else {
            Strand::Positive
        },
        mapping_quality: record.mapq(),
        is_paired: record.is_paired(),
        is_first_of_pair: record.is_first_in_template(),
        is_proper_pair: record.is_proper_pair(),
        mate_start: record.mpos() + 1,
    }
}

impl AlignmentStore for BamAlignmentStore {
    fn reference_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn reference_length(&self, reference: &str) -> Option<u32> {
        self.lengths.get(reference).copied()
    }

    fn query_overlapping<'a>(
        &'a mut self,
        reference: &str,
        range: GenomicRange,
    ) -> std::result::Result<RecordStream<'a>, StoreError> {
        let start = i64::from(range.start()) - 1;
        let end = i64::from(range.end());
        self.reader.fetch((reference, start, end))?;
        Ok(Box::new(self.reader.records().map(|result| {
            result
                .map(|record| convert(&record))
                .map_err(|err| Box::new(err) as StoreError)
        })))
    }
}
