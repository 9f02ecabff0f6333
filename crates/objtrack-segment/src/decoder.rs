//! Seam between raw segmentation payloads and the tracker.

use serde::Deserialize;

use crate::SegmentObject;

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("segmentation payload is empty")]
    Empty,
    #[error("malformed segmentation payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mask {width}x{height} needs {expected} samples, got {got}")]
    MaskSize {
        width: usize,
        height: usize,
        expected: usize,
        got: usize,
    },
    #[error("mask {width}x{height} is too large")]
    MaskTooLarge { width: usize, height: usize },
}

/// Turns an opaque payload into segmented objects.
pub trait SegmentationDecoder: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<Vec<SegmentObject>, DecodeError>;
}

/// Decodes `{"objects": [{"centroid": [x, y], "mask": {"width", "height", "data"}}]}`.
///
/// Either field of an object may be omitted. Anything that is not such a JSON
/// document (compressed mask archives included) is a [`DecodeError`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSegmentationDecoder;

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    objects: Vec<SegmentObject>,
}

impl SegmentationDecoder for JsonSegmentationDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Vec<SegmentObject>, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Empty);
        }
        let parsed: Payload = serde_json::from_slice(payload)?;
        for mask in parsed.objects.iter().filter_map(|o| o.mask.as_ref()) {
            mask.validate()?;
        }
        Ok(parsed.objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn decodes_centroids_and_masks() {
        let payload = br#"{"objects":[
            {"centroid":[120.0, 80.5]},
            {"mask":{"width":3,"height":2,"data":[0,1,0,0,1,0]}}
        ]}"#;
        let objects = JsonSegmentationDecoder.decode(payload).expect("decode");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].center(), Some(Point2::new(120.0, 80.5)));
        assert_eq!(objects[1].center(), Some(Point2::new(1.0, 0.5)));
    }

    #[test]
    fn zip_archive_bytes_are_malformed() {
        let npz_header = b"PK\x03\x04\x14\x00\x00\x00\x08\x00";
        assert!(matches!(
            JsonSegmentationDecoder.decode(npz_header),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            JsonSegmentationDecoder.decode(b""),
            Err(DecodeError::Empty)
        ));
    }

    #[test]
    fn inconsistent_mask_is_rejected() {
        let payload = br#"{"objects":[{"mask":{"width":4,"height":4,"data":[1,1]}}]}"#;
        assert!(matches!(
            JsonSegmentationDecoder.decode(payload),
            Err(DecodeError::MaskSize { .. })
        ));
    }

    #[test]
    fn huge_mask_header_is_rejected() {
        let payload = br#"{"objects":[{"mask":{"width":18446744073709551615,"height":2,"data":[]}}]}"#;
        assert!(matches!(
            JsonSegmentationDecoder.decode(payload),
            Err(DecodeError::MaskTooLarge { .. })
        ));
    }
}
