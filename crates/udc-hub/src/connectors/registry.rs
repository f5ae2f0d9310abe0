//! # Connector Registry
//!
//! Maps each [`Source`] to its connector. Built once in `main` and shared
//! read-only through the application state.

use std::collections::HashMap;
use std::sync::Arc;

use udc_core::pipeline::PageLimits;
use udc_core::{ConnectorError, RecordStore, Source};

use super::analytics::AnalyticsConnector;
use super::crm::CrmConnector;
use super::support::SupportConnector;
use super::{Connector, ConnectorDescriptor};

#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<Source, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All three built-in connectors over one store.
    pub fn with_store(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CrmConnector::new(store.clone(), limits)));
        registry.register(Arc::new(SupportConnector::new(store.clone(), limits)));
        registry.register(Arc::new(AnalyticsConnector::new(store, limits)));
        registry
    }

    /// Register a connector, replacing any previous one for the same source.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        let source = connector.source();
        if self.connectors.insert(source, connector).is_some() {
            tracing::warn!(%source, "replaced existing connector");
        }
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&source).cloned()
    }

    /// Look a connector up by source name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Connector>, ConnectorError> {
        let source: Source = name.parse()?;
        self.get(source)
            .ok_or_else(|| ConnectorError::UnknownSource(name.to_string()))
    }

    /// Descriptors in the fixed source order.
    pub fn descriptors(&self) -> Vec<ConnectorDescriptor> {
        Source::ALL
            .iter()
            .filter_map(|s| self.connectors.get(s))
            .map(|c| c.descriptor())
            .collect()
    }
}
