//! Normalization of whole product listings.
//!
//! Listings arrive as JSON Lines with most attributes wrapped in one of the
//! record shapes handled by [`crate::attributes`]. Normalizing replaces each
//! known field with its extracted value and leaves everything else alone.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::BufRead;

use crate::attributes::{extract, AttributeKind};

/// Known listing fields and the record shape each one carries
pub const LISTING_FIELDS: &[(&str, AttributeKind)] = &[
    ("item_name", AttributeKind::Localized),
    ("brand", AttributeKind::Localized),
    ("bullet_point", AttributeKind::Localized),
    ("color", AttributeKind::Localized),
    ("material", AttributeKind::Localized),
    ("fabric_type", AttributeKind::Localized),
    ("style", AttributeKind::Localized),
    ("model_name", AttributeKind::Localized),
    ("product_description", AttributeKind::Localized),
    ("item_keywords", AttributeKind::Localized),
    ("item_shape", AttributeKind::Localized),
    ("pattern", AttributeKind::Localized),
    ("finish_type", AttributeKind::Localized),
    ("product_type", AttributeKind::SingleValue),
    ("model_number", AttributeKind::SingleValue),
    ("model_year", AttributeKind::SingleValue),
    ("color_code", AttributeKind::SingleValue),
    ("item_weight", AttributeKind::Weight),
    ("item_dimensions", AttributeKind::Dimensions),
    ("node", AttributeKind::NodeList),
];

/// Fields joined into the text half of a multimodal embedding input
const EMBEDDING_TEXT_FIELDS: &[&str] = &[
    "item_name",
    "brand",
    "color",
    "material",
    "fabric_type",
    "style",
    "product_type",
];

/// Shape carried by a listing field, if it is a known one
pub fn field_kind(field: &str) -> Option<AttributeKind> {
    LISTING_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

/// Replace each known field of `listing` with its extracted value.
///
/// Fields whose record has an unexpected shape keep their raw value; a
/// localized field without an `en_US` entry becomes `null`. Non-object
/// listings are returned unchanged.
pub fn normalize_listing(listing: &Value) -> Value {
    let Some(fields) = listing.as_object() else {
        return listing.clone();
    };

    let normalized: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| {
            let value = match field_kind(name) {
                Some(kind) => {
                    let extraction = extract(kind, value);
                    if !extraction.is_extracted() {
                        tracing::debug!(field = %name, ?extraction, "field kept without extraction");
                    }
                    extraction.into_value()
                }
                None => value.clone(),
            };
            (name.clone(), value)
        })
        .collect();

    Value::Object(normalized)
}

/// Text sent alongside the product image: populated descriptive fields of
/// a normalized listing, separated by `"; "`.
pub fn embedding_text(listing: &Value) -> String {
    EMBEDDING_TEXT_FIELDS
        .iter()
        .filter_map(|field| listing.get(*field)?.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a JSON Lines stream, skipping blank lines.
pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Vec<Value>> {
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}
