//! Request/result types crossing the provider boundary.

use serde::{Deserialize, Serialize};

use atelier_core::media::MediaType;
use atelier_core::types::DbId;

/// Everything a provider needs to run one generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Our job id; providers echo it for correlation.
    pub job_id: DbId,
    pub media_type: MediaType,
    /// Opaque generation parameters as submitted by the user.
    pub payload: serde_json::Value,
}

/// A completed generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResult {
    /// The provider's handle for the produced artifact, if any.
    pub reference: Option<String>,
    /// Result document attached to the job record.
    pub output: serde_json::Value,
}
