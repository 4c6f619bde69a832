use crate::genomics::GenomicRange;

/// Immutable set of disjoint, sorted, non-adjacent genomic ranges.
///
/// Used for N-regions and mask-regions of packed sequences and for the
/// bounding location extracted from feature filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    blocks: Vec<GenomicRange>,
}

impl IntervalSet {
    /// Set covering no positions.
    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Union of arbitrary (possibly overlapping, unsorted) ranges.
    ///
    /// Touching ranges such as `1..5` and `6..9` are merged into one block.
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = GenomicRange>,
    {
        let mut sorted: Vec<GenomicRange> = ranges.into_iter().collect();
        sorted.sort_unstable();

        let mut blocks: Vec<GenomicRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match blocks.last_mut() {
                Some(last) if u64::from(range.start()) <= u64::from(last.end()) + 1 => {
                    *last = last.hull(&range);
                }
                _ => blocks.push(range),
            }
        }
        Self { blocks }
    }

    /// Whether the set covers no positions.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of maximal blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Maximal blocks in ascending order.
    pub fn blocks(&self) -> &[GenomicRange] {
        &self.blocks
    }

    /// Total number of covered bases.
    pub fn covered_bases(&self) -> u64 {
        self.blocks.iter().map(|b| u64::from(b.len())).sum()
    }

    /// Smallest single range covering the whole set.
    pub fn span(&self) -> Option<GenomicRange> {
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        Some(first.hull(last))
    }

    /// Whether `position` is covered.
    pub fn contains(&self, position: u32) -> bool {
        // First block whose end reaches the position.
        let idx = self.blocks.partition_point(|b| b.end() < position);
        self.blocks
            .get(idx)
            .map(|b| b.start() <= position)
            .unwrap_or(false)
    }

    /// Blocks sharing at least one base with `range`, unclipped.
    pub fn overlapping(&self, range: &GenomicRange) -> &[GenomicRange] {
        let lo = self.blocks.partition_point(|b| b.end() < range.start());
        let hi = self.blocks.partition_point(|b| b.start() <= range.end());
        &self.blocks[lo..hi.max(lo)]
    }

    /// Positions covered by either set.
    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        IntervalSet::from_ranges(self.blocks.iter().chain(other.blocks.iter()).copied())
    }

    /// Positions covered by both sets.
    pub fn intersection(&self, other: &IntervalSet) -> IntervalSet {
        let mut blocks = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.blocks.len() && j < other.blocks.len() {
            let a = &self.blocks[i];
            let b = &other.blocks[j];
            if let Some(shared) = a.intersection(b) {
                blocks.push(shared);
            }
            if a.end() < b.end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        // Inputs are disjoint and sorted, so the output already is.
        IntervalSet { blocks }
    }

    /// Positions of the set that fall inside `range`.
    pub fn restrict(&self, range: &GenomicRange) -> IntervalSet {
        self.intersection(&IntervalSet::from(*range))
    }
}

impl From<GenomicRange> for IntervalSet {
    fn from(range: GenomicRange) -> Self {
        Self {
            blocks: vec![range],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u32, end: u32) -> GenomicRange {
        GenomicRange::new(start, end).unwrap()
    }

    #[test]
    fn from_ranges_merges_overlapping_and_touching() {
        let set = IntervalSet::from_ranges([r(20, 30), r(1, 5), r(6, 9), r(25, 40), r(50, 50)]);
        assert_eq!(set.blocks(), &[r(1, 9), r(20, 40), r(50, 50)]);
        assert_eq!(set.covered_bases(), 9 + 21 + 1);
        assert_eq!(set.span(), Some(r(1, 50)));
    }

    #[test]
    fn contains_uses_block_bounds() {
        let set = IntervalSet::from_ranges([r(10, 20), r(30, 40)]);
        assert!(!set.contains(9));
        assert!(set.contains(10));
        assert!(set.contains(20));
        assert!(!set.contains(25));
        assert!(set.contains(40));
        assert!(!set.contains(41));
        assert!(!IntervalSet::empty().contains(1));
    }

    #[test]
    fn intersection_and_union() {
        let a = IntervalSet::from_ranges([r(1, 10), r(20, 30)]);
        let b = IntervalSet::from_ranges([r(5, 25)]);
        assert_eq!(a.intersection(&b).blocks(), &[r(5, 10), r(20, 25)]);
        assert_eq!(a.union(&b).blocks(), &[r(1, 30)]);
        assert!(a.intersection(&IntervalSet::empty()).is_empty());
    }

    #[test]
    fn overlapping_returns_whole_blocks() {
        let set = IntervalSet::from_ranges([r(1, 10), r(20, 30), r(40, 50)]);
        assert_eq!(set.overlapping(&r(8, 21)), &[r(1, 10), r(20, 30)]);
        assert!(set.overlapping(&r(11, 19)).is_empty());
        assert_eq!(set.restrict(&r(8, 21)).blocks(), &[r(8, 10), r(20, 21)]);
    }
}
