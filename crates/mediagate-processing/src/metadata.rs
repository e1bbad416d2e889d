//! Metadata result types returned by the pipelines

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

/// EXIF tag name to rendered value, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ExifTags(pub BTreeMap<String, String>);

impl ExifTags {
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one video pipeline run.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoOutput {
    /// Raw `ffmetadata` document emitted by the decoder
    pub metadata: String,
    /// Global key/value pairs parsed from `metadata`
    pub tags: BTreeMap<String, String>,
    /// Size of the uploaded body in bytes
    pub media_size: u64,
    /// PNG frame, base64 encoded on the wire
    #[serde(serialize_with = "serialize_thumbnail")]
    #[schema(value_type = Option<String>, format = Byte)]
    pub thumbnail: Option<Vec<u8>>,
}

fn serialize_thumbnail<S>(thumbnail: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match thumbnail {
        Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}
