//! Repository for the `prices` table.
//!
//! Admin-writable, read on every submission. Each price is a single row,
//! so readers never observe a torn write.

use sqlx::PgPool;

use atelier_core::media::MediaTypeId;
use atelier_core::types::Credits;

use crate::models::price::PriceEntry;

/// Column list for joined price queries.
const COLUMNS: &str =
    "prices.media_type_id, media_types.code, prices.price, prices.updated_at";

/// Provides read/write access to the price table.
pub struct PriceRepo;

impl PriceRepo {
    /// Current price for a media type.
    pub async fn get(
        pool: &PgPool,
        media_type_id: MediaTypeId,
    ) -> Result<Option<PriceEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prices \
             JOIN media_types ON media_types.id = prices.media_type_id \
             WHERE prices.media_type_id = $1"
        );
        sqlx::query_as::<_, PriceEntry>(&query)
            .bind(media_type_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the price for a media type. A single UPDATE; affects only jobs
    /// priced after it commits.
    ///
    /// Returns `false` if the media type has no price row (unknown type).
    pub async fn set(
        pool: &PgPool,
        media_type_id: MediaTypeId,
        price: Credits,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE prices SET price = $2, updated_at = NOW() WHERE media_type_id = $1",
        )
        .bind(media_type_id)
        .bind(price)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All price entries in media type order.
    pub async fn list(pool: &PgPool) -> Result<Vec<PriceEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prices \
             JOIN media_types ON media_types.id = prices.media_type_id \
             ORDER BY prices.media_type_id ASC"
        );
        sqlx::query_as::<_, PriceEntry>(&query).fetch_all(pool).await
    }
}
