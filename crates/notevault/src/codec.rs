//! # Record Codec
//!
//! Every slot on disk holds one framed record:
//!
//! ```text
//! +-------+---------+-----------+-------------+------------------+
//! | magic | version | crc32 LE  | body len LE | JSON body        |
//! | 4 B   | 1 B     | 4 B       | 4 B         | body len bytes   |
//! +-------+---------+-----------+-------------+------------------+
//! ```
//!
//! The frame catches truncation and bit rot before serde ever sees the body. The body
//! is JSON with defaulted optional fields, so adding fields keeps old readers working;
//! the version byte only moves for incompatible frame changes.
//!
//! Decoding a record never panics. Any failure is reported as
//! [`VaultError::Corrupt`] carrying the slot's kind and id.
//!
//! Drawings use the same frame with their own magic but a different failure policy:
//! [`decode_drawing`] logs and returns an empty [`Drawing`] instead of failing, since
//! losing ink is recoverable while losing the document is not.

use crate::error::{Result, VaultError};
use crate::model::{Drawing, Record};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

const RECORD_MAGIC: [u8; 4] = *b"NVRC";
const DRAWING_MAGIC: [u8; 4] = *b"NVDR";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 4 + 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("truncated header ({0} bytes)")]
    Truncated(usize),

    #[error("unknown magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("body length mismatch: header says {expected}, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("body of {0} bytes does not fit the length field")]
    TooLarge(usize),
}

fn length_field(len: usize) -> std::result::Result<u32, FrameError> {
    u32::try_from(len).map_err(|_| FrameError::TooLarge(len))
}

fn frame(magic: [u8; 4], body: &[u8]) -> std::result::Result<Vec<u8>, FrameError> {
    let len = length_field(body.len())?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&magic);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&crc32fast::hash(body).to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(body);
    Ok(out)
}

fn unframe(magic: [u8; 4], bytes: &[u8]) -> std::result::Result<&[u8], FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::Truncated(bytes.len()));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);

    let found: [u8; 4] = [header[0], header[1], header[2], header[3]];
    if found != magic {
        return Err(FrameError::BadMagic(found));
    }
    let version = header[4];
    if version == 0 || version > FORMAT_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }
    let crc = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
    let len = u32::from_le_bytes([header[9], header[10], header[11], header[12]]) as usize;
    if len != body.len() {
        return Err(FrameError::LengthMismatch {
            expected: len,
            actual: body.len(),
        });
    }
    if crc32fast::hash(body) != crc {
        return Err(FrameError::ChecksumMismatch);
    }
    Ok(body)
}

/// Encodes a record into its framed on-disk form. Deterministic for equal inputs.
pub fn encode<T: Record + Serialize>(record: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(record)?;
    frame(RECORD_MAGIC, &body).map_err(|_| VaultError::TooLarge {
        kind: T::KIND,
        id: record.id(),
        len: body.len(),
    })
}

/// Decodes the record stored in slot `id`.
///
/// The decoded id must match the slot id; a mismatch means the file was copied or
/// renamed by hand and is treated as corruption.
pub fn decode<T: Record + DeserializeOwned>(id: Uuid, bytes: &[u8]) -> Result<T> {
    let corrupt = |reason: String| VaultError::Corrupt {
        kind: T::KIND,
        id,
        reason,
    };
    let body = unframe(RECORD_MAGIC, bytes).map_err(|e| corrupt(e.to_string()))?;
    let record: T = serde_json::from_slice(body).map_err(|e| corrupt(e.to_string()))?;
    if record.id() != id {
        return Err(corrupt(format!("slot holds record {}", record.id())));
    }
    record.validate().map_err(|e| corrupt(e.to_string()))?;
    Ok(record)
}

/// Encodes a drawing payload.
pub fn encode_drawing(drawing: &Drawing) -> Vec<u8> {
    let framed = serde_json::to_vec(drawing)
        .map_err(|e| e.to_string())
        .and_then(|body| frame(DRAWING_MAGIC, &body).map_err(|e| e.to_string()));
    match framed {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("event=drawing_encode_failed error={}", err);
            Vec::new()
        }
    }
}

/// Decodes a drawing payload. Empty or damaged payloads yield an empty drawing.
pub fn decode_drawing(bytes: &[u8]) -> Drawing {
    if bytes.is_empty() {
        return Drawing::default();
    }
    let decoded = unframe(DRAWING_MAGIC, bytes)
        .map_err(|e| e.to_string())
        .and_then(|body| serde_json::from_slice(body).map_err(|e| e.to_string()));
    match decoded {
        Ok(drawing) => drawing,
        Err(reason) => {
            warn!(
                "event=drawing_decode_failed bytes={} reason=\"{}\"",
                bytes.len(),
                reason
            );
            Drawing::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Color, Container, DeletedRecord, Document, EntityKind, ImageAnnotation, PageSize,
        PageTemplate, Point, Rect, ShapeAnnotation, ShapeKind, Stroke, TextAnnotation, Tool,
    };
    use chrono::Utc;

    fn rich_document() -> Document {
        let mut doc = Document::new("Physics", Some(Uuid::new_v4()));
        doc.page_size = PageSize::Custom {
            width: 210.5,
            height: 297.25,
        };
        let page_id = doc.add_page(PageTemplate::Grid);
        let mut page = doc.page(page_id).unwrap().clone();
        page.set_drawing(&Drawing {
            strokes: vec![Stroke {
                tool: Tool::Pencil,
                color: Color::new(10, 20, 30),
                width: 1.5,
                points: vec![Point { x: 0.1, y: 0.2 }, Point { x: 10.0, y: 20.0 }],
            }],
        });
        page.thumbnail = Some(vec![0, 255, 7, 9]);
        page.texts.push(TextAnnotation {
            id: Uuid::new_v4(),
            text: "F = ma".into(),
            frame: Rect::new(1.0, 2.0, 30.0, 12.0),
            font_size: 14.0,
            color: Color::BLACK,
        });
        page.images.push(ImageAnnotation {
            id: Uuid::new_v4(),
            frame: Rect::new(5.0, 5.0, 50.0, 50.0),
            data: vec![137, 80, 78, 71],
            rotation: 90.0,
        });
        page.shapes.push(ShapeAnnotation {
            id: Uuid::new_v4(),
            shape: ShapeKind::Arrow,
            frame: Rect::new(0.0, 0.0, 10.0, 10.0),
            stroke: Color::new(0, 0, 255),
            fill: Some(Color::new(200, 200, 200)),
            stroke_width: 3.0,
        });
        doc.update_page(page).unwrap();
        doc
    }

    #[test]
    fn document_roundtrip() {
        let doc = rich_document();
        let bytes = encode(&doc).unwrap();
        let decoded: Document = decode(doc.id, &bytes).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn container_and_deleted_record_roundtrip() {
        let mut folder = Container::new("Semester 1", None);
        folder.color = Some(Color::new(12, 34, 56));
        let decoded: Container = decode(folder.id, &encode(&folder).unwrap()).unwrap();
        assert_eq!(decoded, folder);

        let record = DeletedRecord {
            id: Uuid::new_v4(),
            original_id: folder.id,
            name: folder.name.clone(),
            kind: EntityKind::Container,
            deleted_at: Utc::now(),
            snapshot: encode(&folder).unwrap(),
            original_parent_id: None,
        };
        let decoded: DeletedRecord = decode(record.id, &encode(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn encoding_is_deterministic() {
        let doc = rich_document();
        assert_eq!(encode(&doc).unwrap(), encode(&doc).unwrap());
    }

    #[test]
    fn truncated_record_is_corrupt() {
        let doc = Document::new("Short", None);
        let bytes = encode(&doc).unwrap();
        for cut in [0, 3, HEADER_LEN, bytes.len() - 1] {
            let err = decode::<Document>(doc.id, &bytes[..cut]).unwrap_err();
            match err {
                VaultError::Corrupt { id, .. } => assert_eq!(id, doc.id),
                other => panic!("expected corruption, got {other:?}"),
            }
        }
    }

    #[test]
    fn flipped_body_byte_fails_checksum() {
        let doc = Document::new("Bitrot", None);
        let mut bytes = encode(&doc).unwrap();
        let last = bytes.len() - 2;
        bytes[last] ^= 0x20;
        let err = decode::<Document>(doc.id, &bytes).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn garbage_is_corrupt_not_panic() {
        let id = Uuid::new_v4();
        let err = decode::<Container>(id, b"hello there, I am not a record").unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn future_version_is_rejected() {
        let folder = Container::new("Future", None);
        let mut bytes = encode(&folder).unwrap();
        bytes[4] = FORMAT_VERSION + 1;
        let err = decode::<Container>(folder.id, &bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported format version"));
    }

    #[test]
    fn record_in_wrong_slot_is_corrupt() {
        let folder = Container::new("Misplaced", None);
        let bytes = encode(&folder).unwrap();
        assert!(decode::<Container>(Uuid::new_v4(), &bytes)
            .unwrap_err()
            .is_corrupt());
    }

    #[test]
    fn wrong_kind_is_corrupt() {
        let folder = Container::new("Not a doc", None);
        let bytes = encode(&folder).unwrap();
        assert!(decode::<Document>(folder.id, &bytes).unwrap_err().is_corrupt());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_body_is_refused_not_truncated() {
        let max = u32::MAX as usize;
        assert_eq!(length_field(max), Ok(u32::MAX));
        assert_eq!(length_field(max + 1), Err(FrameError::TooLarge(max + 1)));
    }

    #[test]
    fn document_without_pages_is_corrupt() {
        let mut doc = Document::new("Hollow", None);
        doc.pages.clear();
        let bytes = encode(&doc).unwrap();
        let err = decode::<Document>(doc.id, &bytes).unwrap_err();
        assert!(err.is_corrupt());
        assert!(err.to_string().contains("at least one page"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let folder = Container::new("Newer writer", None);
        let mut value = serde_json::to_value(&folder).unwrap();
        value["icon"] = serde_json::json!("star");
        let bytes = frame(RECORD_MAGIC, &serde_json::to_vec(&value).unwrap()).unwrap();
        let decoded: Container = decode(folder.id, &bytes).unwrap();
        assert_eq!(decoded, folder);
    }

    #[test]
    fn drawing_decode_is_lossy() {
        assert!(decode_drawing(&[]).is_empty());
        assert!(decode_drawing(b"\x00\x01\x02").is_empty());

        let drawing = Drawing {
            strokes: vec![Stroke {
                tool: Tool::Highlighter,
                color: Color::new(255, 255, 0),
                width: 8.0,
                points: vec![Point { x: 3.0, y: 4.0 }],
            }],
        };
        let mut bytes = encode_drawing(&drawing);
        assert_eq!(decode_drawing(&bytes), drawing);

        bytes.truncate(bytes.len() - 3);
        assert!(decode_drawing(&bytes).is_empty());
    }

    #[test]
    fn record_bytes_are_not_a_drawing() {
        let doc = Document::new("Wrong magic", None);
        assert!(decode_drawing(&encode(&doc).unwrap()).is_empty());
    }
}
