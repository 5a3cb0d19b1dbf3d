//! Payload Normalizer — turns whatever the file store hands back into a single
//! binary object with an explicit media type.
//!
//! Stored resumes arrive in several shapes depending on how they were written:
//! a typed object, raw bytes, a window over a larger buffer, base64 text (often a
//! data URL), or a JSON document. `normalize` classifies the payload and runs one
//! conversion per shape. Every failure degrades to `None`; nothing here does I/O.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use bytes::Bytes;
use tracing::warn;

/// Marker separating a data-URL header from its base64 body.
const BASE64_MARKER: &str = "base64,";

/// Generic content types that say nothing about what the bytes are.
const OPAQUE_CONTENT_TYPES: &[&str] = &["application/octet-stream", "binary/octet-stream"];

/// Lenient like the browser's `atob`: padding may be present or absent, and
/// non-zero bits left over in the final symbol are discarded.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

// ────────────────────────────────────────────────────────────────────────────
// Data model
// ────────────────────────────────────────────────────────────────────────────

/// Bytes tagged with the media type a rendering surface should use for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBinary {
    pub media_type: String,
    pub data: Bytes,
}

impl NormalizedBinary {
    pub fn new(media_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

/// A stored value of unknown representation, as read from the file store.
#[derive(Debug, Clone, PartialEq)]
pub enum OpaquePayload {
    /// Already a typed binary object.
    Blob(NormalizedBinary),
    /// Raw bytes with no type information.
    Buffer(Bytes),
    /// A window of `len` bytes starting at `offset` into `buffer`.
    View {
        buffer: Bytes,
        offset: usize,
        len: usize,
    },
    /// Text, expected to be base64 or a base64 data URL.
    Text(String),
    /// Any other structured value.
    Structured(serde_json::Value),
}

/// Shape tag produced by the classification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    BinaryObject,
    ByteBuffer,
    TypedView,
    Text,
    Structured,
}

impl OpaquePayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            OpaquePayload::Blob(_) => PayloadKind::BinaryObject,
            OpaquePayload::Buffer(_) => PayloadKind::ByteBuffer,
            OpaquePayload::View { .. } => PayloadKind::TypedView,
            OpaquePayload::Text(_) => PayloadKind::Text,
            OpaquePayload::Structured(_) => PayloadKind::Structured,
        }
    }

    /// Classifies an object body by the content type it was stored with.
    ///
    /// - `application/json` bodies that parse become `Structured`
    /// - `text/*` bodies that are valid UTF-8 become `Text`
    /// - any other specific content type becomes a typed `Blob`
    /// - no content type (or a generic octet-stream) stays a raw `Buffer`
    pub fn from_stored(content_type: Option<&str>, body: Bytes) -> Self {
        let essence = content_type
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty());

        let Some(essence) = essence else {
            return OpaquePayload::Buffer(body);
        };

        if essence == "application/json" {
            return match serde_json::from_slice(&body) {
                Ok(value) => OpaquePayload::Structured(value),
                Err(_) => OpaquePayload::Buffer(body),
            };
        }

        if essence.starts_with("text/") {
            return match String::from_utf8(body.to_vec()) {
                Ok(text) => OpaquePayload::Text(text),
                Err(_) => OpaquePayload::Buffer(body),
            };
        }

        if OPAQUE_CONTENT_TYPES.contains(&essence.as_str()) {
            return OpaquePayload::Buffer(body);
        }

        OpaquePayload::Blob(NormalizedBinary::new(essence, body))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Converts `payload` into a displayable binary object.
///
/// `fallback_media_type` tags every result whose type cannot be read off the
/// payload itself. Returns `None` for an absent payload and for every payload
/// that cannot be converted; never panics.
pub fn normalize(
    payload: Option<&OpaquePayload>,
    fallback_media_type: &str,
) -> Option<NormalizedBinary> {
    let payload = payload?;
    match payload {
        OpaquePayload::Blob(blob) => Some(blob.clone()),
        OpaquePayload::Buffer(bytes) => {
            Some(NormalizedBinary::new(fallback_media_type, bytes.clone()))
        }
        OpaquePayload::View {
            buffer,
            offset,
            len,
        } => from_view(buffer, *offset, *len, fallback_media_type),
        OpaquePayload::Text(text) => from_base64_text(text, fallback_media_type),
        OpaquePayload::Structured(value) => from_structured(value, fallback_media_type),
    }
}

fn from_view(
    buffer: &Bytes,
    offset: usize,
    len: usize,
    media_type: &str,
) -> Option<NormalizedBinary> {
    let end = offset.checked_add(len)?;
    if end > buffer.len() {
        warn!(
            "Typed view [{offset}..{end}) exceeds buffer of {} bytes",
            buffer.len()
        );
        return None;
    }
    Some(NormalizedBinary::new(
        media_type,
        Bytes::copy_from_slice(&buffer[offset..end]),
    ))
}

fn from_base64_text(text: &str, media_type: &str) -> Option<NormalizedBinary> {
    let encoded = match text.find(BASE64_MARKER) {
        Some(idx) => &text[idx + BASE64_MARKER.len()..],
        None => text,
    };
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match LENIENT_BASE64.decode(compact.as_bytes()) {
        Ok(bytes) => Some(NormalizedBinary::new(media_type, bytes)),
        Err(e) => {
            warn!("Failed to decode base64 payload as {media_type}: {e}");
            None
        }
    }
}

fn from_structured(value: &serde_json::Value, media_type: &str) -> Option<NormalizedBinary> {
    match serde_json::to_vec(value) {
        Ok(bytes) => Some(NormalizedBinary::new(media_type, bytes)),
        Err(e) => {
            warn!("Failed to serialize structured payload: {e}");
            None
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PDF: &str = "application/pdf";

    #[test]
    fn test_absent_payload_is_none() {
        assert_eq!(normalize(None, PDF), None);
        assert_eq!(normalize(None, "image/png"), None);
    }

    #[test]
    fn test_blob_returned_unchanged() {
        let blob = NormalizedBinary::new("image/jpeg", vec![0xFFu8, 0xD8, 0xFF]);
        let out = normalize(Some(&OpaquePayload::Blob(blob.clone())), "image/png").unwrap();
        assert_eq!(out, blob);
        assert_eq!(out.media_type, "image/jpeg");
    }

    #[test]
    fn test_buffer_round_trips_exactly() {
        let bytes = Bytes::from_static(b"%PDF-1.7\n\x00\x01\x02binary");
        let out = normalize(Some(&OpaquePayload::Buffer(bytes.clone())), PDF).unwrap();
        assert_eq!(out.data, bytes);
        assert_eq!(out.media_type, PDF);
    }

    #[test]
    fn test_view_copies_only_the_window() {
        let payload = OpaquePayload::View {
            buffer: Bytes::from_static(b"xx%PDF-tailyy"),
            offset: 2,
            len: 9,
        };
        let out = normalize(Some(&payload), PDF).unwrap();
        assert_eq!(&out.data[..], b"%PDF-tail");
    }

    #[test]
    fn test_view_out_of_range_is_none() {
        let payload = OpaquePayload::View {
            buffer: Bytes::from_static(b"short"),
            offset: 3,
            len: 10,
        };
        assert_eq!(normalize(Some(&payload), PDF), None);

        let overflow = OpaquePayload::View {
            buffer: Bytes::from_static(b"short"),
            offset: usize::MAX,
            len: 2,
        };
        assert_eq!(normalize(Some(&overflow), PDF), None);
    }

    #[test]
    fn test_plain_base64_text_decodes() {
        // "%PDF-1.4"
        let out = normalize(Some(&OpaquePayload::Text("JVBERi0xLjQ=".into())), PDF).unwrap();
        assert_eq!(&out.data[..], b"%PDF-1.4");
        assert_eq!(out.media_type, PDF);
    }

    #[test]
    fn test_data_url_decodes_only_after_marker() {
        let text = "data:image/png;base64,iVBORw0KGgo=";
        let out = normalize(Some(&OpaquePayload::Text(text.into())), "image/png").unwrap();
        assert_eq!(&out.data[..], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(out.media_type, "image/png");
    }

    #[test]
    fn test_base64_without_padding_or_with_whitespace() {
        let unpadded = normalize(Some(&OpaquePayload::Text("JVBERi0xLjQ".into())), PDF).unwrap();
        assert_eq!(&unpadded.data[..], b"%PDF-1.4");

        let wrapped =
            normalize(Some(&OpaquePayload::Text("JVBE\nRi0x\r\nLjQ=".into())), PDF).unwrap();
        assert_eq!(&wrapped.data[..], b"%PDF-1.4");

        // "R" carries set bits past the end of the decoded byte.
        let trailing = normalize(Some(&OpaquePayload::Text("YR==".into())), PDF).unwrap();
        assert_eq!(&trailing.data[..], b"a");
    }

    #[test]
    fn test_malformed_base64_is_none() {
        assert_eq!(
            normalize(Some(&OpaquePayload::Text("not base64 at all!".into())), PDF),
            None
        );
        assert_eq!(
            normalize(
                Some(&OpaquePayload::Text("data:application/pdf;base64,@@@".into())),
                PDF
            ),
            None
        );
    }

    #[test]
    fn test_structured_serializes_to_json_bytes() {
        let value = json!({"pages": 2, "title": "Resume"});
        let out = normalize(Some(&OpaquePayload::Structured(value.clone())), "application/json")
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out.data).unwrap();
        assert_eq!(parsed, value);
        assert_eq!(out.media_type, "application/json");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let payloads = [
            OpaquePayload::Buffer(Bytes::from_static(b"abc")),
            OpaquePayload::Text("data:;base64,aGVsbG8=".into()),
            OpaquePayload::Structured(json!([1, 2, 3])),
        ];
        for payload in &payloads {
            let first = normalize(Some(payload), PDF);
            let second = normalize(Some(payload), PDF);
            assert_eq!(first, second, "not idempotent for {:?}", payload.kind());
        }
    }

    #[test]
    fn test_from_stored_classification() {
        let body = Bytes::from_static(b"%PDF-1.4");
        assert_eq!(
            OpaquePayload::from_stored(None, body.clone()).kind(),
            PayloadKind::ByteBuffer
        );
        assert_eq!(
            OpaquePayload::from_stored(Some("application/octet-stream"), body.clone()).kind(),
            PayloadKind::ByteBuffer
        );
        assert_eq!(
            OpaquePayload::from_stored(Some("text/plain; charset=utf-8"), body.clone()).kind(),
            PayloadKind::Text
        );
        assert_eq!(
            OpaquePayload::from_stored(Some("application/json"), Bytes::from_static(b"{}"))
                .kind(),
            PayloadKind::Structured
        );
        assert_eq!(
            OpaquePayload::from_stored(Some("application/json"), Bytes::from_static(b"{oops"))
                .kind(),
            PayloadKind::ByteBuffer
        );

        match OpaquePayload::from_stored(Some("Application/PDF"), body.clone()) {
            OpaquePayload::Blob(blob) => {
                assert_eq!(blob.media_type, "application/pdf");
                assert_eq!(blob.data, body);
            }
            other => panic!("expected blob, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_from_stored_non_utf8_text_falls_back_to_buffer() {
        let payload =
            OpaquePayload::from_stored(Some("text/plain"), Bytes::from_static(&[0xFF, 0xFE]));
        assert_eq!(payload.kind(), PayloadKind::ByteBuffer);
    }
}
