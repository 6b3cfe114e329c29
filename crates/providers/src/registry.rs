//! Per-media-type provider lookup.

use std::collections::HashMap;
use std::sync::Arc;

use atelier_core::media::MediaType;

use crate::Provider;

/// Maps each media type to its configured provider adapter.
///
/// Built once at startup and shared via `Arc`. A media type without an
/// entry cannot be generated; the dispatcher fails such jobs as fatal.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<MediaType, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for `media_type`, replacing any previous entry.
    pub fn with_provider(mut self, media_type: MediaType, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(media_type, provider);
        self
    }

    /// Look up the provider for a media type.
    pub fn get(&self, media_type: MediaType) -> Option<Arc<dyn Provider>> {
        self.providers.get(&media_type).cloned()
    }

    /// Media types with a registered provider.
    pub fn supported(&self) -> Vec<MediaType> {
        let mut types: Vec<_> = self.providers.keys().copied().collect();
        types.sort_by_key(|m| m.id());
        types
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::error::ProviderError;
    use crate::request::{GenerationRequest, GenerationResult};

    use super::*;

    struct NullProvider;

    #[async_trait]
    impl Provider for NullProvider {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResult, ProviderError> {
            Ok(GenerationResult {
                reference: None,
                output: serde_json::Value::Null,
            })
        }
    }

    #[test]
    fn empty_registry_has_no_providers() {
        let registry = ProviderRegistry::new();
        assert!(registry.get(MediaType::Text).is_none());
        assert!(registry.supported().is_empty());
    }

    #[test]
    fn registered_provider_is_found() {
        let registry = ProviderRegistry::new()
            .with_provider(MediaType::Image, Arc::new(NullProvider));
        assert!(registry.get(MediaType::Image).is_some());
        assert!(registry.get(MediaType::Video).is_none());
        assert_eq!(registry.supported(), vec![MediaType::Image]);
    }

    #[test]
    fn supported_is_sorted_by_seed_order() {
        let registry = ProviderRegistry::new()
            .with_provider(MediaType::ThreeD, Arc::new(NullProvider))
            .with_provider(MediaType::Text, Arc::new(NullProvider));
        assert_eq!(
            registry.supported(),
            vec![MediaType::Text, MediaType::ThreeD]
        );
    }
}
