//! Price table row model.

use serde::Serialize;
use sqlx::FromRow;

use atelier_core::media::MediaTypeId;
use atelier_core::types::{Credits, Timestamp};

/// A price entry joined with its media type code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceEntry {
    pub media_type_id: MediaTypeId,
    /// Wire code of the media type (`text`, `image`, ...).
    pub code: String,
    pub price: Credits,
    pub updated_at: Timestamp,
}
