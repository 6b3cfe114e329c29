//! Provider adapters: the boundary between the dispatcher and external
//! generation services.
//!
//! One [`Provider`] exists per media type; the dispatcher looks adapters
//! up in a [`ProviderRegistry`] and treats every implementation as an
//! opaque service with a classified error surface (transient vs. fatal).

pub mod error;
pub mod http;
pub mod registry;
pub mod request;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use registry::ProviderRegistry;
pub use request::{GenerationRequest, GenerationResult};

use async_trait::async_trait;

/// An opaque generation service for one media type.
///
/// Implementations must be cheap to share (`Arc<dyn Provider>`); the
/// dispatcher bounds each call with its own timeout, so `generate` may
/// block for the duration of the external request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one generation request to completion.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, ProviderError>;
}
