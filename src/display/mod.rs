//! Display of search results: a text listing and a single-row image grid.
//!
//! Hits are shown in the order given; ranking belongs to the search service.

mod grid;
mod listing;

pub use grid::{panel_areas, show, show_image_grid, GridPanel, ImageGrid};
pub use listing::{print_result_list, write_result_list, SEPARATOR};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of hits shown when the caller does not say
pub const DEFAULT_LIMIT: usize = 3;

/// One scored hit from the search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_score")]
    pub score: f64,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: HitSource,
}

/// Display fields of the indexed document. Fields may still hold raw
/// attribute records when extraction did not apply at index time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HitSource {
    #[serde(default)]
    pub item_name: Option<Value>,
    #[serde(default)]
    pub fabric_type: Option<Value>,
    #[serde(default)]
    pub material: Option<Value>,
    #[serde(default)]
    pub color: Option<Value>,
    #[serde(default)]
    pub style: Option<Value>,
    /// Image key relative to the size variant directory
    #[serde(default)]
    pub path: Option<String>,
}

/// Parse hits from either a bare array or a full search response
/// (`{"hits": {"hits": [...]}}`).
pub fn load_hits(json: &str) -> serde_json::Result<Vec<SearchHit>> {
    let mut value: Value = serde_json::from_str(json)?;

    if let Some(hits) = value.pointer_mut("/hits/hits") {
        return serde_json::from_value(hits.take());
    }

    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_hits_from_array() {
        let hits = load_hits(
            r#"[{"_score": 0.87, "_id": "B07", "_source": {"item_name": "Boot", "path": "8c/boot.jpg"}}]"#,
        )
        .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "B07");
        assert_eq!(hits[0].source.path.as_deref(), Some("8c/boot.jpg"));
        assert!(hits[0].source.color.is_none());
    }

    #[test]
    fn test_load_hits_from_search_response() {
        let hits = load_hits(
            r#"{"took": 3, "hits": {"total": {"value": 2}, "hits": [
                {"_score": 1.0, "_id": "a", "_source": {}},
                {"_score": 0.5, "_id": "b"}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_load_hits_rejects_other_documents() {
        assert!(load_hits(r#"{"error": "index_not_found"}"#).is_err());
        assert!(load_hits("not json").is_err());
    }
}
