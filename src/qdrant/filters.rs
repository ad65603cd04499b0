//! Filter construction for filename-scoped similarity search.

use serde_json::{Value, json};

use super::payload::normalize_filename;

/// Compose the Qdrant filter restricting hits to the given source files.
///
/// Each entry is normalized with the same key function used at ingestion, so
/// callers may pass raw filenames or already-normalized keys. The match is
/// "any of" across the set; an empty or blank-only set yields no filter. The
/// predicate runs inside the store's keyword index, never as a client-side
/// scan.
pub fn build_filename_filter(selected_files: &[String]) -> Option<Value> {
    let keys: Vec<String> = selected_files
        .iter()
        .map(|name| normalize_filename(name))
        .filter(|key| !key.is_empty())
        .collect();

    if keys.is_empty() {
        return None;
    }

    Some(json!({
        "must": [
            {
                "key": "filename",
                "match": { "any": keys }
            }
        ]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_any_normalized_key() {
        let filter =
            build_filename_filter(&["Report v2.pdf".into(), "geo".into()]).expect("filter");

        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "filename",
                        "match": { "any": ["report_v2", "geo"] }
                    }
                ]
            })
        );
    }

    #[test]
    fn empty_selection_yields_no_filter() {
        assert!(build_filename_filter(&[]).is_none());
        assert!(build_filename_filter(&["   ".into()]).is_none());
    }
}
