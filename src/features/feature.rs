use std::collections::BTreeMap;
use std::fmt;

use crate::genomics::{GenomicRange, Strand};

/// Kinds of feature produced by the annotation sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FeatureType {
    /// One aligned read.
    Mapping,
    /// Read-depth summary for one tile.
    Density,
    /// GC fraction for one tile.
    Gc,
    /// CpG observed/expected ratio for one tile.
    CpgOe,
    /// Repeat-masked interval.
    Repeat,
}

impl FeatureType {
    /// Type name as exposed to clients.
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Mapping => "mapping",
            FeatureType::Density => "density",
            FeatureType::Gc => "gc",
            FeatureType::CpgOe => "cpgoe",
            FeatureType::Repeat => "repeat",
        }
    }

    /// Source tag attached to features of this type.
    pub fn source(self) -> &'static str {
        match self {
            FeatureType::Mapping | FeatureType::Density => "sam",
            FeatureType::Gc | FeatureType::CpgOe => "comp",
            FeatureType::Repeat => "ucsc",
        }
    }

    /// Parse a client-facing type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mapping" => Some(FeatureType::Mapping),
            "density" => Some(FeatureType::Density),
            "gc" => Some(FeatureType::Gc),
            "cpgoe" => Some(FeatureType::CpgOe),
            "repeat" => Some(FeatureType::Repeat),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value stored in a feature's annotation map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum AnnotationValue {
    /// Numeric property such as `score`.
    Number(f64),
    /// Free text such as the `pair` group key.
    Text(String),
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Number(v) => write!(f, "{v}"),
            AnnotationValue::Text(s) => f.write_str(s),
        }
    }
}

/// Group membership derived from a feature's annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroup {
    /// Group identifier (the read name for pairs).
    pub id: String,
    /// Group type.
    pub group_type: &'static str,
}

/// A located, typed annotation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Feature {
    /// Feature type.
    pub feature_type: FeatureType,
    /// Source tag.
    pub source: &'static str,
    /// Location (1-based, inclusive).
    pub range: GenomicRange,
    /// Orientation.
    pub strand: Strand,
    /// Free-form properties, ordered by key.
    pub annotation: BTreeMap<String, AnnotationValue>,
}

impl Feature {
    /// Feature with the type's default source tag and no annotation.
    pub fn new(feature_type: FeatureType, range: GenomicRange, strand: Strand) -> Self {
        Self {
            feature_type,
            source: feature_type.source(),
            range,
            strand,
            annotation: BTreeMap::new(),
        }
    }

    /// Attach a numeric `score`.
    pub fn with_score(self, score: f64) -> Self {
        self.with_annotation("score", AnnotationValue::Number(score))
    }

    /// Attach an arbitrary property.
    pub fn with_annotation(mut self, key: impl Into<String>, value: AnnotationValue) -> Self {
        self.annotation.insert(key.into(), value);
        self
    }

    /// Numeric `score` property, if present.
    pub fn score(&self) -> Option<f64> {
        match self.annotation.get("score") {
            Some(AnnotationValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    /// Groups this feature belongs to: a `pair` group when the feature
    /// carries a pair key.
    pub fn groups(&self) -> Vec<FeatureGroup> {
        match self.annotation.get("pair") {
            Some(value) => vec![FeatureGroup {
                id: value.to_string(),
                group_type: "pair",
            }],
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Feature {
    /// Tab-separated: type, source, start, end, strand, then `key=value`
    /// annotation pairs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.feature_type,
            self.source,
            self.range.start(),
            self.range.end(),
            self.strand.symbol()
        )?;
        for (key, value) in &self.annotation {
            write!(f, "\t{key}={value}")?;
        }
        Ok(())
    }
}

/// Ordered collection of features returned by one query.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Empty set.
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Append a feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Features of one type, in emission order.
    pub fn of_type(&self, feature_type: FeatureType) -> impl Iterator<Item = &Feature> + '_ {
        self.features
            .iter()
            .filter(move |f| f.feature_type == feature_type)
    }

    /// Number of features of one type.
    pub fn count_of(&self, feature_type: FeatureType) -> usize {
        self.of_type(feature_type).count()
    }

    /// Advisory content hash over the tab-separated rendering.
    pub fn fingerprint(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for feature in &self.features {
            hasher.update(feature.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize()
    }
}

impl IntoIterator for FeatureSet {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

impl Extend<Feature> for FeatureSet {
    fn extend<T: IntoIterator<Item = Feature>>(&mut self, iter: T) {
        self.features.extend(iter);
    }
}
