//! Helpers for constructing Qdrant payloads and filename keys.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::ChunkInsert;

/// Derive the filterable filename key used across ingestion and querying.
///
/// Takes the basename, drops the extension, lowercases, and collapses
/// whitespace runs into underscores: `"docs/Report v2.pdf"` becomes
/// `"report_v2"`. Idempotent, so already-normalized keys pass through.
pub fn normalize_filename(source: &str) -> String {
    let base = source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source);
    let stem = match base.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => base,
    };

    let mut key = String::with_capacity(stem.len());
    let mut pending_gap = false;
    for ch in stem.chars() {
        if ch.is_whitespace() {
            pending_gap = !key.is_empty();
        } else {
            if pending_gap {
                key.push('_');
                pending_gap = false;
            }
            key.extend(ch.to_lowercase());
        }
    }
    key
}

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_chunk_payload(chunk: &ChunkInsert, timestamp_rfc3339: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("content".into(), Value::String(chunk.content.clone()));
    payload.insert("source".into(), Value::String(chunk.source.clone()));
    payload.insert("page".into(), Value::from(chunk.page));
    payload.insert("filename".into(), Value::String(chunk.filename.clone()));
    payload.insert(
        "indexed_at".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    Value::Object(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier suitable for Qdrant points.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_spaces_case_and_extension() {
        assert_eq!(normalize_filename("Report v2.pdf"), "report_v2");
        assert_eq!(normalize_filename("geo.pdf"), "geo");
        assert_eq!(normalize_filename("uploads/Annual  Report.PDF"), "annual_report");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_filename("My File.pdf");
        assert_eq!(normalize_filename(&once), once);
    }

    #[test]
    fn handles_names_without_extension() {
        assert_eq!(normalize_filename("README"), "readme");
        assert_eq!(normalize_filename(".env"), ".env");
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_carries_chunk_schema() {
        let chunk = ChunkInsert {
            content: "Paris is the capital of France.".into(),
            source: "geo.pdf".into(),
            page: 0,
            filename: "geo".into(),
            vector: vec![0.1, 0.2],
        };
        let payload = build_chunk_payload(&chunk, "2025-01-01T00:00:00Z");
        assert_eq!(payload["content"], "Paris is the capital of France.");
        assert_eq!(payload["source"], "geo.pdf");
        assert_eq!(payload["page"], 0);
        assert_eq!(payload["filename"], "geo");
        assert_eq!(payload["indexed_at"], "2025-01-01T00:00:00Z");
    }
}
