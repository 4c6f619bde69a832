use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::features::{Feature, FeatureFilter, FeatureSet, FeatureType};
use crate::genomics::{resolve_reference_name, GenomicRange, IntervalSet, Strand};
use crate::{AnnotationError, Result};

/// Magic number at offset 0 of every 2bit container.
pub const TWOBIT_SIGNATURE: u32 = 0x1A41_2743;
/// Only container version understood by the decoder.
const SUPPORTED_VERSION: u32 = 0;
/// Bases packed into one payload byte.
const BASES_PER_BYTE: u32 = 4;
/// Symbol for each 2-bit code, most-significant pair first.
const BASE_LUT: [u8; 4] = [b'T', b'C', b'A', b'G'];
/// Size of the fixed container header.
const HEADER_LEN: usize = 16;

/// Byte order detected from the container signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least-significant byte first.
    Little,
    /// Most-significant byte first.
    Big,
}

impl ByteOrder {
    fn detect(signature: [u8; 4]) -> Option<Self> {
        if u32::from_le_bytes(signature) == TWOBIT_SIGNATURE {
            Some(ByteOrder::Little)
        } else if u32::from_be_bytes(signature) == TWOBIT_SIGNATURE {
            Some(ByteOrder::Big)
        } else {
            None
        }
    }

    fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }
}

/// Options applied when a store is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    /// Skip mask blocks: every sequence reports an empty mask-region set.
    pub elide_repeats: bool,
}

impl StoreOptions {
    /// Enable or disable repeat elision.
    pub fn with_elide_repeats(mut self, enabled: bool) -> Self {
        self.elide_repeats = enabled;
        self
    }
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Backing::Mapped(map) => map,
            Backing::Owned(bytes) => bytes,
        }
    }
}

/// Read-only view over the whole container. Every read takes an absolute
/// offset; there is no shared cursor.
struct ContainerBytes {
    backing: Backing,
    order: ByteOrder,
}

impl fmt::Debug for ContainerBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBytes")
            .field("len", &self.backing.len())
            .field("order", &self.order)
            .finish()
    }
}

impl ContainerBytes {
    fn len(&self) -> usize {
        self.backing.len()
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.backing.get(offset..end))
            .ok_or_else(|| {
                AnnotationError::format(format!(
                    "truncated container: need {len} bytes at offset {offset}, file has {}",
                    self.backing.len()
                ))
            })
    }

    fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    fn u32_at(&self, offset: usize) -> Result<u32> {
        let raw = self.slice(offset, 4)?;
        Ok(self.order.decode([raw[0], raw[1], raw[2], raw[3]]))
    }
}

/// Random-access store over a 2bit genome container.
///
/// Opening parses only the header and the name→offset directory (plus each
/// record's base count). Region lists and the payload location of each
/// sequence are decoded on first use.
#[derive(Debug)]
pub struct PackedGenomeStore {
    bytes: Arc<ContainerBytes>,
    sequences: Vec<Arc<PackedSequence>>,
    by_name: HashMap<String, usize>,
    options: StoreOptions,
}

impl PackedGenomeStore {
    /// Memory-map and parse the container at `path`.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        let io_error = |source| AnnotationError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        // SAFETY: the mapping is read-only and the container is never written while served.
        let map = unsafe { Mmap::map(&file) }.map_err(io_error)?;
        let store = Self::from_backing(Backing::Mapped(map), options)?;
        info!(
            path = %path.display(),
            sequences = store.len(),
            byte_order = ?store.byte_order(),
            elide_repeats = options.elide_repeats,
            "opened 2bit container"
        );
        Ok(store)
    }

    /// Parse a container already held in memory.
    pub fn from_bytes(bytes: Vec<u8>, options: StoreOptions) -> Result<Self> {
        Self::from_backing(Backing::Owned(bytes), options)
    }

    fn from_backing(backing: Backing, options: StoreOptions) -> Result<Self> {
        let signature = backing
            .get(..4)
            .ok_or_else(|| AnnotationError::format("container shorter than its signature"))?;
        let order = ByteOrder::detect([signature[0], signature[1], signature[2], signature[3]])
            .ok_or_else(|| AnnotationError::format("bad 2bit signature"))?;
        let bytes = Arc::new(ContainerBytes { backing, order });

        let version = bytes.u32_at(4)?;
        if version != SUPPORTED_VERSION {
            return Err(AnnotationError::format(format!(
                "unsupported 2bit version {version}"
            )));
        }
        let count = bytes.u32_at(8)? as usize;
        bytes.u32_at(12)?; // reserved

        let mut sequences = Vec::with_capacity(count.min(bytes.len() / 6));
        let mut by_name = HashMap::with_capacity(sequences.capacity());
        let mut cursor = HEADER_LEN;
        for _ in 0..count {
            let name_len = bytes.u8_at(cursor)? as usize;
            let name = std::str::from_utf8(bytes.slice(cursor + 1, name_len)?)
                .map_err(|_| AnnotationError::format("sequence name is not valid UTF-8"))?
                .to_string();
            cursor += 1 + name_len;
            let record_offset = bytes.u32_at(cursor)? as usize;
            cursor += 4;

            let length = bytes.u32_at(record_offset)?;
            let sequence = PackedSequence {
                name: name.clone(),
                length,
                record_offset,
                elide_repeats: options.elide_repeats,
                bytes: Arc::clone(&bytes),
                layout: RwLock::new(None),
                decode_guard: Mutex::new(()),
            };
            by_name.entry(name).or_insert(sequences.len());
            sequences.push(Arc::new(sequence));
        }

        Ok(Self {
            bytes,
            sequences,
            by_name,
            options,
        })
    }

    /// Byte order detected from the signature.
    pub fn byte_order(&self) -> ByteOrder {
        self.bytes.order
    }

    /// Options the store was opened with.
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Number of sequences in the directory.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence names in directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sequences.iter().map(|s| s.name())
    }

    /// Whether `name` is stored verbatim.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Look up a sequence, toggling a `chr` prefix when the exact name is absent.
    pub fn sequence(&self, name: &str) -> Result<Arc<PackedSequence>> {
        let resolved = resolve_reference_name(name, |candidate| self.contains(candidate))
            .ok_or_else(|| AnnotationError::NotFound(name.to_string()))?;
        let idx = self.by_name[&resolved];
        Ok(Arc::clone(&self.sequences[idx]))
    }
}

/// Region lists and payload location of one sequence record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceLayout {
    n_regions: IntervalSet,
    mask_regions: IntervalSet,
    longest_mask_block: u32,
    dna_start: usize,
}

impl SequenceLayout {
    /// Unknown-base regions (1-based).
    pub fn n_regions(&self) -> &IntervalSet {
        &self.n_regions
    }

    /// Repeat-masked regions (1-based); empty when repeats are elided.
    pub fn mask_regions(&self) -> &IntervalSet {
        &self.mask_regions
    }

    /// Length of the longest single mask block as stored in the file.
    pub fn longest_mask_block(&self) -> u32 {
        self.longest_mask_block
    }
}

/// One sequence of a [`PackedGenomeStore`].
///
/// Holds a shared handle on the container bytes, so it stays valid for as
/// long as any caller keeps it, independent of the store.
pub struct PackedSequence {
    name: String,
    length: u32,
    record_offset: usize,
    elide_repeats: bool,
    bytes: Arc<ContainerBytes>,
    layout: RwLock<Option<Arc<SequenceLayout>>>,
    decode_guard: Mutex<()>,
}

impl fmt::Debug for PackedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedSequence")
            .field("name", &self.name)
            .field("length", &self.length)
            .field("record_offset", &self.record_offset)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}

#[allow(clippy::len_without_is_empty)]
impl PackedSequence {
    /// Name as stored in the directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bases.
    pub fn len(&self) -> u32 {
        self.length
    }

    /// Whether the region lists have been decoded yet.
    pub fn is_decoded(&self) -> bool {
        self.layout.read().is_some()
    }

    /// Decoded layout, decoding it on first call.
    pub fn layout(&self) -> Result<Arc<SequenceLayout>> {
        if let Some(layout) = self.layout.read().as_ref() {
            return Ok(Arc::clone(layout));
        }

        let _guard = self.decode_guard.lock();
        if let Some(layout) = self.layout.read().as_ref() {
            return Ok(Arc::clone(layout));
        }
        let decoded = Arc::new(self.decode_layout()?);
        *self.layout.write() = Some(Arc::clone(&decoded));
        Ok(decoded)
    }

    fn decode_layout(&self) -> Result<SequenceLayout> {
        trace!(sequence = %self.name, offset = self.record_offset, "decoding 2bit record header");
        let bytes = &self.bytes;
        let mut cursor = self.record_offset + 4;

        let n_count = bytes.u32_at(cursor)? as usize;
        cursor += 4;
        let (n_blocks, _) = self.block_list(cursor, n_count)?;
        cursor += n_count * 8;

        let mask_count = bytes.u32_at(cursor)? as usize;
        cursor += 4;
        let (mask_regions, longest_mask_block) = if self.elide_repeats {
            (IntervalSet::empty(), 0)
        } else {
            let (blocks, longest) = self.block_list(cursor, mask_count)?;
            (IntervalSet::from_ranges(blocks), longest)
        };
        cursor += mask_count * 8;

        bytes.u32_at(cursor)?; // reserved
        cursor += 4;

        let payload_len = self.length.div_ceil(BASES_PER_BYTE) as usize;
        bytes.slice(cursor, payload_len)?;

        Ok(SequenceLayout {
            n_regions: IntervalSet::from_ranges(n_blocks),
            mask_regions,
            longest_mask_block,
            dna_start: cursor,
        })
    }

    /// Read `count` 0-based starts followed by `count` sizes; returns 1-based
    /// ranges and the largest size seen.
    fn block_list(&self, offset: usize, count: usize) -> Result<(Vec<GenomicRange>, u32)> {
        let table_len = count
            .checked_mul(8)
            .ok_or_else(|| AnnotationError::format("block count overflows"))?;
        self.bytes.slice(offset, table_len)?;

        let mut blocks = Vec::with_capacity(count);
        let mut longest = 0u32;
        for i in 0..count {
            let start = self.bytes.u32_at(offset + 4 * i)?;
            let size = self.bytes.u32_at(offset + 4 * (count + i))?;
            longest = longest.max(size);
            if size == 0 {
                continue;
            }
            let end = start.checked_add(size).ok_or_else(|| {
                AnnotationError::format(format!("block {start}+{size} overflows in {}", self.name))
            })?;
            blocks.extend(GenomicRange::new(start + 1, end));
        }
        Ok((blocks, longest))
    }

    fn check_position(&self, position: i64) -> Result<u32> {
        if position < 1 || position > i64::from(self.length) {
            return Err(AnnotationError::Bounds {
                position,
                length: self.length,
            });
        }
        Ok(position as u32)
    }

    /// Base at 1-based `position` as an uppercase ASCII byte (`N` inside
    /// N-regions).
    pub fn symbol_at(&self, position: i64) -> Result<u8> {
        let position = self.check_position(position)?;
        let layout = self.layout()?;
        if layout.n_regions.contains(position) {
            return Ok(b'N');
        }
        let offset = (position - 1) as usize;
        let byte = self.bytes.u8_at(layout.dna_start + offset / BASES_PER_BYTE as usize)?;
        Ok(unpack_base(byte, offset % BASES_PER_BYTE as usize))
    }

    /// Decode `range` into uppercase ASCII bases.
    pub fn fetch(&self, range: &GenomicRange) -> Result<Vec<u8>> {
        self.check_position(i64::from(range.start()))?;
        self.check_position(i64::from(range.end()))?;
        let layout = self.layout()?;

        let first = (range.start() - 1) as usize;
        let last = (range.end() - 1) as usize;
        let per_byte = BASES_PER_BYTE as usize;
        let packed = self.bytes.slice(
            layout.dna_start + first / per_byte,
            last / per_byte - first / per_byte + 1,
        )?;

        let mut out = Vec::with_capacity(range.len() as usize);
        for idx in first..=last {
            let byte = packed[idx / per_byte - first / per_byte];
            out.push(unpack_base(byte, idx % per_byte));
        }

        for block in layout.n_regions.overlapping(range) {
            if let Some(clipped) = block.intersection(range) {
                let lo = (clipped.start() - range.start()) as usize;
                let hi = (clipped.end() - range.start()) as usize;
                out[lo..=hi].fill(b'N');
            }
        }
        Ok(out)
    }

    /// One `repeat` feature per maximal masked block overlapping the
    /// filter's location (all blocks when the filter is unbounded).
    pub fn repeat_features(&self, filter: &FeatureFilter) -> Result<FeatureSet> {
        let layout = self.layout()?;
        // Merged blocks are reported whole, never clipped to the query.
        let candidates: &[GenomicRange] = match filter.bounding_location() {
            None => layout.mask_regions.blocks(),
            Some(location) => match location.span() {
                Some(span) => layout.mask_regions.overlapping(&span),
                None => &[],
            },
        };

        let mut result = FeatureSet::new();
        for block in candidates {
            let feature = Feature::new(FeatureType::Repeat, *block, Strand::Unknown);
            if filter.accept(&feature) {
                result.push(feature);
            }
        }
        debug!(
            sequence = %self.name,
            candidates = candidates.len(),
            emitted = result.len(),
            "realized repeat features"
        );
        Ok(result)
    }
}

fn unpack_base(byte: u8, slot: usize) -> u8 {
    let shift = 6 - 2 * slot;
    BASE_LUT[((byte >> shift) & 0b11) as usize]
}
