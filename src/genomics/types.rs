use std::fmt;
use std::sync::Arc;

/// Strand of a stranded feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Strand {
    /// Forward strand.
    Positive,
    /// Reverse strand.
    Negative,
    /// Strand not applicable (density and composition tiles).
    Unknown,
}

impl Strand {
    /// Single-character rendering used in tabular output.
    pub fn symbol(self) -> char {
        match self {
            Strand::Positive => '+',
            Strand::Negative => '-',
            Strand::Unknown => '.',
        }
    }
}

/// Closed genomic interval `[start, end]` in 1-based coordinates.
///
/// Never empty and never touches position 0: `1 <= start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GenomicRange {
    start: u32,
    end: u32,
}

#[allow(clippy::len_without_is_empty)]
impl GenomicRange {
    /// Construct a range, returning `None` when `start` is 0 or `start > end`.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start >= 1 && start <= end).then_some(Self { start, end })
    }

    /// Range between two bounds given in either order, clamped at position 1.
    pub fn from_bounds(a: u32, b: u32) -> Self {
        Self {
            start: a.min(b).max(1),
            end: a.max(b).max(1),
        }
    }

    /// Single-base range; position 0 clamps to 1.
    pub fn point(position: u32) -> Self {
        let position = position.max(1);
        Self {
            start: position,
            end: position,
        }
    }

    /// First base (inclusive).
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Last base (inclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of bases covered.
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Whether `position` falls inside the range.
    pub fn contains(&self, position: u32) -> bool {
        self.start <= position && position <= self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains_range(&self, other: &GenomicRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the two ranges share at least one base.
    pub fn overlaps(&self, other: &GenomicRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Shared bases, if any.
    pub fn intersection(&self, other: &GenomicRange) -> Option<GenomicRange> {
        GenomicRange::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Smallest range covering both.
    pub fn hull(&self, other: &GenomicRange) -> GenomicRange {
        GenomicRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Grow by `by` bases on each side, clamped at position 1.
    pub fn expand(&self, by: u32) -> GenomicRange {
        GenomicRange {
            start: self.start.saturating_sub(by).max(1),
            end: self.end.saturating_add(by),
        }
    }
}

impl fmt::Display for GenomicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Alignment record as delivered by an alignment store.
///
/// Coordinates are 1-based inclusive and signed: stores report unplaced
/// records with non-positive positions, which the density aggregator skips.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    /// Query template name.
    pub read_name: Arc<str>,
    /// First aligned reference base.
    pub start: i64,
    /// Last aligned reference base.
    pub end: i64,
    /// Alignment orientation.
    pub strand: Strand,
    /// Mapping quality (Phred-scaled).
    pub mapping_quality: u8,
    /// Template has multiple segments.
    pub is_paired: bool,
    /// First segment of the template.
    pub is_first_of_pair: bool,
    /// Each segment properly aligned according to the aligner.
    pub is_proper_pair: bool,
    /// First aligned base of the mate (1-based; 0 when unknown).
    pub mate_start: i64,
}

impl AlignmentRecord {
    /// Unpaired forward-strand record with mapping quality 60.
    pub fn new(read_name: impl Into<Arc<str>>, start: i64, end: i64) -> Self {
        Self {
            read_name: read_name.into(),
            start,
            end,
            strand: Strand::Positive,
            mapping_quality: 60,
            is_paired: false,
            is_first_of_pair: false,
            is_proper_pair: false,
            mate_start: 0,
        }
    }

    /// Set the mapping quality.
    pub fn with_mapping_quality(mut self, mapq: u8) -> Self {
        self.mapping_quality = mapq;
        self
    }

    /// Mark the record as aligned to the reverse strand.
    pub fn reversed(mut self) -> Self {
        self.strand = Strand::Negative;
        self
    }

    /// Mark the record as one segment of a pair.
    pub fn with_mate(mut self, mate_start: i64, first_of_pair: bool, proper_pair: bool) -> Self {
        self.is_paired = true;
        self.mate_start = mate_start;
        self.is_first_of_pair = first_of_pair;
        self.is_proper_pair = proper_pair;
        self
    }

    /// Aligned span, if both ends are placed.
    pub fn aligned_range(&self) -> Option<GenomicRange> {
        if self.start <= 0 || self.end <= 0 {
            return None;
        }
        let start = u32::try_from(self.start).ok()?;
        let end = u32::try_from(self.end).ok()?;
        GenomicRange::new(start, end)
    }

    /// Whether this record stands for its whole fragment: unpaired, or the
    /// first segment of a properly paired template.
    pub fn represents_fragment(&self) -> bool {
        !self.is_paired || (self.is_first_of_pair && self.is_proper_pair)
    }

    /// Span implied by the fragment this record belongs to.
    ///
    /// Paired records assume the mate has the same aligned length; the
    /// leftmost segment fixes the left edge.
    pub fn fragment_range(&self) -> Option<GenomicRange> {
        let own = self.aligned_range()?;
        if !self.is_paired {
            return Some(own);
        }
        let (start, end) = (self.start, self.end);
        let mate = self.mate_start;
        let (min_pos, max_pos) = if start < mate {
            (start, mate + (end - start))
        } else {
            (mate, end)
        };
        if min_pos <= 0 {
            return Some(own);
        }
        let min_pos = u32::try_from(min_pos).ok()?;
        let max_pos = u32::try_from(max_pos).ok()?;
        GenomicRange::new(min_pos, max_pos)
    }
}

/// Resolve a requested reference name against the names a source knows,
/// toggling a leading `chr` when the exact name is absent.
pub fn resolve_reference_name<F>(requested: &str, known: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    if known(requested) {
        return Some(requested.to_string());
    }
    let toggled = match requested.strip_prefix("chr") {
        Some(stripped) => stripped.to_string(),
        None => format!("chr{requested}"),
    };
    if known(&toggled) {
        tracing::warn!(requested, resolved = %toggled, "resolved reference via chr prefix");
        Some(toggled)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_set_operations() {
        let a = GenomicRange::new(10, 20).unwrap();
        let b = GenomicRange::new(15, 30).unwrap();
        assert_eq!(a.intersection(&b), GenomicRange::new(15, 20));
        assert_eq!(a.hull(&b), GenomicRange::new(10, 30).unwrap());
        assert!(a.overlaps(&b));
        assert!(a.contains(20));
        assert!(!a.contains(21));
        assert_eq!(a.len(), 11);
        assert!(GenomicRange::new(5, 4).is_none());
        assert!(a.intersection(&GenomicRange::point(21)).is_none());
    }

    #[test]
    fn position_zero_never_starts_a_range() {
        assert!(GenomicRange::new(0, 2).is_none());
        assert!(GenomicRange::new(0, 0).is_none());
        assert_eq!(GenomicRange::from_bounds(50, 0), GenomicRange::new(1, 50).unwrap());
        assert_eq!(GenomicRange::from_bounds(0, 0), GenomicRange::point(1));
        assert_eq!(GenomicRange::point(0).start(), 1);
        assert_eq!(GenomicRange::from_bounds(0, u32::MAX).len(), u32::MAX);
    }

    #[test]
    fn expand_clamps_at_first_base() {
        let r = GenomicRange::new(3, 10).unwrap();
        assert_eq!(r.expand(5), GenomicRange::new(1, 15).unwrap());
    }

    #[test]
    fn fragment_span_for_leftmost_and_rightmost_segment() {
        let left = AlignmentRecord::new("r", 100, 149).with_mate(300, true, true);
        assert_eq!(left.fragment_range(), GenomicRange::new(100, 349));

        let right = AlignmentRecord::new("r", 300, 349).with_mate(100, true, true);
        assert_eq!(right.fragment_range(), GenomicRange::new(100, 349));

        let single = AlignmentRecord::new("s", 10, 20);
        assert_eq!(single.fragment_range(), GenomicRange::new(10, 20));
    }

    #[test]
    fn unplaced_records_have_no_range() {
        assert!(AlignmentRecord::new("u", 0, 20).aligned_range().is_none());
        assert!(AlignmentRecord::new("u", 5, -1).aligned_range().is_none());
    }

    #[test]
    fn chr_prefix_toggles_both_ways() {
        let names = ["chr5", "X"];
        let known = |n: &str| names.contains(&n);
        assert_eq!(resolve_reference_name("5", known).as_deref(), Some("chr5"));
        assert_eq!(resolve_reference_name("chrX", known).as_deref(), Some("X"));
        assert_eq!(resolve_reference_name("chr5", known).as_deref(), Some("chr5"));
        assert!(resolve_reference_name("7", known).is_none());
    }
}
