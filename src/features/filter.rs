use crate::features::{Feature, FeatureType};
use crate::genomics::{GenomicRange, IntervalSet};

/// Acceptance predicate over features.
///
/// Location variants also bound the range an aggregator has to scan; see
/// [`FeatureFilter::bounding_location`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureFilter {
    /// Accept everything.
    All,
    /// Features sharing at least one base with the range.
    Overlaps(GenomicRange),
    /// Features lying entirely within the range.
    ContainedBy(GenomicRange),
    /// Features of one type.
    ByType(FeatureType),
    /// Features rejected by the inner filter.
    Not(Box<FeatureFilter>),
    /// Features accepted by both filters.
    And(Box<FeatureFilter>, Box<FeatureFilter>),
    /// Features accepted by either filter.
    Or(Box<FeatureFilter>, Box<FeatureFilter>),
}

impl FeatureFilter {
    /// `Overlaps` over `[start, end]`, accepting the bounds in either order.
    pub fn overlapping(start: u32, end: u32) -> Self {
        FeatureFilter::Overlaps(GenomicRange::from_bounds(start, end))
    }

    /// `ContainedBy` over `[start, end]`, accepting the bounds in either order.
    pub fn contained_by(start: u32, end: u32) -> Self {
        FeatureFilter::ContainedBy(GenomicRange::from_bounds(start, end))
    }

    /// Conjunction with `other`.
    pub fn and(self, other: FeatureFilter) -> Self {
        FeatureFilter::And(Box::new(self), Box::new(other))
    }

    /// Disjunction with `other`.
    pub fn or(self, other: FeatureFilter) -> Self {
        FeatureFilter::Or(Box::new(self), Box::new(other))
    }

    /// Negation.
    pub fn negate(self) -> Self {
        FeatureFilter::Not(Box::new(self))
    }

    /// Whether `feature` passes the filter.
    pub fn accept(&self, feature: &Feature) -> bool {
        match self {
            FeatureFilter::All => true,
            FeatureFilter::Overlaps(range) => range.overlaps(&feature.range),
            FeatureFilter::ContainedBy(range) => range.contains_range(&feature.range),
            FeatureFilter::ByType(ty) => feature.feature_type == *ty,
            FeatureFilter::Not(inner) => !inner.accept(feature),
            FeatureFilter::And(a, b) => a.accept(feature) && b.accept(feature),
            FeatureFilter::Or(a, b) => a.accept(feature) || b.accept(feature),
        }
    }

    /// Tightest location every accepted feature must touch, or `None` when
    /// the filter does not constrain location.
    ///
    /// `And` intersects (a missing side passes the other through); `Or`
    /// unions only when both sides are bounded. An empty set means no
    /// feature can pass.
    pub fn bounding_location(&self) -> Option<IntervalSet> {
        match self {
            FeatureFilter::Overlaps(range) | FeatureFilter::ContainedBy(range) => {
                Some(IntervalSet::from(*range))
            }
            FeatureFilter::And(a, b) => match (a.bounding_location(), b.bounding_location()) {
                (Some(left), Some(right)) => Some(left.intersection(&right)),
                (Some(left), None) => Some(left),
                (None, right) => right,
            },
            FeatureFilter::Or(a, b) => match (a.bounding_location(), b.bounding_location()) {
                (Some(left), Some(right)) => Some(left.union(&right)),
                _ => None,
            },
            FeatureFilter::All | FeatureFilter::ByType(_) | FeatureFilter::Not(_) => None,
        }
    }
}

/// Range an aggregator scans for `filter` over a sequence of
/// `sequence_length` bases: the span of the bounding location, or the whole
/// sequence when unbounded. `None` when nothing can match.
pub fn query_range(filter: &FeatureFilter, sequence_length: u32) -> Option<GenomicRange> {
    match filter.bounding_location() {
        Some(location) => location.span(),
        None => GenomicRange::new(1, sequence_length),
    }
}
