use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::plugin::AnnotationSource;

/// Metadata describing a registered source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Registration name.
    pub name: String,
    /// Source type tag.
    pub source_type: &'static str,
    /// Source version.
    pub version: &'static str,
}

/// Registry of annotation sources keyed by name.
#[derive(Default)]
pub struct SourceRegistry {
    entries: HashMap<String, Arc<dyn AnnotationSource>>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `name`, replacing any previous entry, and
    /// return a shared handle to it.
    pub fn register<S>(&mut self, name: impl Into<String>, source: S) -> Arc<S>
    where
        S: AnnotationSource + 'static,
    {
        let name = name.into();
        let source = Arc::new(source);
        info!(
            name = %name,
            source_type = source.source_type(),
            version = source.version(),
            "registered annotation source"
        );
        self.entries
            .insert(name, Arc::clone(&source) as Arc<dyn AnnotationSource>);
        source
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AnnotationSource>> {
        self.entries.get(name).cloned()
    }

    /// Remove a source, returning it if it was registered.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn AnnotationSource>> {
        self.entries.remove(name)
    }

    /// All registered sources, sorted by name.
    pub fn list(&self) -> Vec<SourceInfo> {
        let mut infos: Vec<SourceInfo> = self
            .entries
            .iter()
            .map(|(name, source)| SourceInfo {
                name: name.clone(),
                source_type: source.source_type(),
                version: source.version(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}
