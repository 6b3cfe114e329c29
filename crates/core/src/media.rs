//! The closed set of media types a job can produce.
//!
//! Discriminants match the `media_types` seed data (1-based SMALLSERIAL),
//! mirroring how job and broadcast statuses are stored.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Media type ID as stored in SMALLINT columns.
pub type MediaTypeId = i16;

/// A kind of generated media. One provider adapter exists per variant.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Text = 1,
    Image = 2,
    Video = 3,
    Audio = 4,
    ThreeD = 5,
}

/// All supported media types, in seed order.
pub const ALL_MEDIA_TYPES: [MediaType; 5] = [
    MediaType::Text,
    MediaType::Image,
    MediaType::Video,
    MediaType::Audio,
    MediaType::ThreeD,
];

impl MediaType {
    /// Return the database media type ID.
    pub fn id(self) -> MediaTypeId {
        self as MediaTypeId
    }

    /// The wire code used by the external API and the price table.
    pub fn code(self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::ThreeD => "3d",
        }
    }

    /// Parse a wire code. Unknown codes are an admission error.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        match code {
            "text" => Ok(MediaType::Text),
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "audio" => Ok(MediaType::Audio),
            "3d" => Ok(MediaType::ThreeD),
            other => Err(CoreError::UnknownType(other.to_string())),
        }
    }

    /// Look up a media type by its database ID.
    pub fn from_id(id: MediaTypeId) -> Result<Self, CoreError> {
        ALL_MEDIA_TYPES
            .into_iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| CoreError::UnknownType(format!("id {id}")))
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_seed_data() {
        assert_eq!(MediaType::Text.id(), 1);
        assert_eq!(MediaType::Image.id(), 2);
        assert_eq!(MediaType::Video.id(), 3);
        assert_eq!(MediaType::Audio.id(), 4);
        assert_eq!(MediaType::ThreeD.id(), 5);
    }

    #[test]
    fn code_round_trips_for_all_types() {
        for media in ALL_MEDIA_TYPES {
            assert_eq!(MediaType::from_code(media.code()).unwrap(), media);
        }
    }

    #[test]
    fn id_round_trips_for_all_types() {
        for media in ALL_MEDIA_TYPES {
            assert_eq!(MediaType::from_id(media.id()).unwrap(), media);
        }
    }

    #[test]
    fn unknown_code_rejected() {
        assert!(MediaType::from_code("gif").is_err());
    }

    #[test]
    fn unknown_id_rejected() {
        assert!(MediaType::from_id(99).is_err());
    }

    #[test]
    fn three_d_code_is_3d() {
        assert_eq!(MediaType::ThreeD.code(), "3d");
    }
}
