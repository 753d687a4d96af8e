//! Engine configuration
//!
//! `batch_size` is the only tunable that changes query shape: it bounds the
//! number of identifiers placed in one `VALUES` block by the list fetcher and
//! the multi-URI query.

use crate::error::{MappingError, MappingResult};
use crate::rdf::NamespaceManager;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default number of identifiers per batched query
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifiers per `VALUES` batch
    pub batch_size: usize,
    /// Language used for type labels and label properties, `None` for all
    pub default_lang: Option<String>,
    /// Base for generated resource URIs
    pub uri_base: String,
    /// Extra prefixes for compact URIs (prefix → namespace IRI)
    pub prefixes: IndexMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            default_lang: Some("en".to_string()),
            uri_base: "http://example.org/id/".to_string(),
            prefixes: IndexMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> MappingResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| MappingError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> MappingResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MappingError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style batch size override
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn validate(&self) -> MappingResult<()> {
        if self.batch_size == 0 {
            return Err(MappingError::InvalidConfiguration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if oxiri::Iri::parse(self.uri_base.as_str()).is_err() {
            return Err(MappingError::InvalidConfiguration(format!(
                "uri_base is not an absolute IRI: {}",
                self.uri_base
            )));
        }
        Ok(())
    }

    /// Namespace manager with the default prefixes plus the configured ones
    pub fn namespaces(&self) -> NamespaceManager {
        let mut namespaces = NamespaceManager::new();
        for (prefix, iri) in &self.prefixes {
            namespaces.add_prefix(prefix.clone(), iri.clone());
        }
        namespaces
    }
}
