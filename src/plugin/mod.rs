//! Annotation sources: named providers of typed features that a host serves
//! to clients, plus a registry to look them up by name.

mod api;
mod registry;
mod sources;

pub use api::{AnnotationSource, EntryPoint};
pub use registry::{SourceInfo, SourceRegistry};
pub use sources::{CompositionSource, DensitySource, SequenceSource};
