//! Field extraction for semi-structured product attribute records.
//!
//! Catalog listings carry attributes in a handful of nested shapes, e.g.
//! `[{"value": "Red", "language_tag": "en_US"}]` for localized text or
//! `[{"normalized_value": {"value": 1.2, "unit": "pounds"}}]` for weights.
//! [`AttributeRecord`] models the five known shapes and [`extract`] is the
//! single dispatch point that turns a raw record into display text.
//!
//! Extraction is best-effort: input that does not have the expected shape is
//! handed back untouched as [`Extraction::Unrecognized`], so it can still be
//! stored or displayed raw. Unlike a plain pass-through, callers can tell an
//! extracted string apart from raw input that happened to be a string.

use serde_json::Value;

/// Locale picked out of localized records
pub const TARGET_LOCALE: &str = "en_US";

/// The five record shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `[{value, language_tag}, ...]`
    Localized,
    /// `[{value}, ...]`
    SingleValue,
    /// `[{normalized_value: {value, unit}}, ...]`
    Weight,
    /// `{length|width|height: {normalized_value: {value, unit}}}`
    Dimensions,
    /// `[{node_name}, ...]`
    NodeList,
}

/// A magnitude with its unit
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedValue {
    pub value: Value,
    pub unit: Value,
}

impl NormalizedValue {
    /// Read `{"normalized_value": {"value", "unit"}}`
    fn from_wrapper(wrapper: &Value) -> Option<Self> {
        let normalized = wrapper.get("normalized_value")?;
        Some(Self {
            value: normalized.get("value")?.clone(),
            unit: normalized.get("unit")?.clone(),
        })
    }

    fn text(&self) -> String {
        format!("{} {}", scalar_text(&self.value), scalar_text(&self.unit))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedEntry {
    pub language_tag: Value,
    pub value: Option<Value>,
}

impl LocalizedEntry {
    fn is_target(&self) -> bool {
        self.language_tag == TARGET_LOCALE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dimensions {
    pub length: NormalizedValue,
    pub width: NormalizedValue,
    pub height: NormalizedValue,
}

/// A product attribute record in one of its known shapes.
///
/// Construction validates the shape, so [`AttributeRecord::text`] cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeRecord {
    Localized(Vec<LocalizedEntry>),
    /// Value of the first entry
    SingleValue(Value),
    /// Normalized value of the first entry
    Weight(NormalizedValue),
    Dimensions(Dimensions),
    /// Node names in order, `None` for null names
    NodeList(Vec<Option<String>>),
}

impl AttributeRecord {
    /// Parse `value` as the given shape.
    pub fn parse(kind: AttributeKind, value: &Value) -> Option<Self> {
        match kind {
            AttributeKind::Localized => parse_localized(value),
            AttributeKind::SingleValue => {
                let first = value.as_array()?.first()?;
                Some(Self::SingleValue(first.get("value")?.clone()))
            }
            AttributeKind::Weight => {
                let first = value.as_array()?.first()?;
                NormalizedValue::from_wrapper(first).map(Self::Weight)
            }
            AttributeKind::Dimensions => {
                if !value.is_object() {
                    return None;
                }
                Some(Self::Dimensions(Dimensions {
                    length: NormalizedValue::from_wrapper(value.get("length")?)?,
                    width: NormalizedValue::from_wrapper(value.get("width")?)?,
                    height: NormalizedValue::from_wrapper(value.get("height")?)?,
                }))
            }
            AttributeKind::NodeList => parse_node_list(value),
        }
    }

    /// Infer the shape from the record's structure.
    ///
    /// Empty sequences carry no shape information and are not detected.
    pub fn detect(value: &Value) -> Option<Self> {
        let kind = match value {
            Value::Object(map)
                if map.contains_key("length")
                    && map.contains_key("width")
                    && map.contains_key("height") =>
            {
                AttributeKind::Dimensions
            }
            Value::Array(items) => {
                let first = items.first()?.as_object()?;
                if first.contains_key("language_tag") {
                    AttributeKind::Localized
                } else if first.contains_key("node_name") {
                    AttributeKind::NodeList
                } else if first.contains_key("normalized_value") {
                    AttributeKind::Weight
                } else if first.contains_key("value") {
                    AttributeKind::SingleValue
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        Self::parse(kind, value)
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Localized(_) => AttributeKind::Localized,
            Self::SingleValue(_) => AttributeKind::SingleValue,
            Self::Weight(_) => AttributeKind::Weight,
            Self::Dimensions(_) => AttributeKind::Dimensions,
            Self::NodeList(_) => AttributeKind::NodeList,
        }
    }

    /// Display text of the record. `None` only for a localized record
    /// without an entry in [`TARGET_LOCALE`].
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Localized(entries) => entries
                .iter()
                .find(|entry| entry.is_target())
                .and_then(|entry| entry.value.as_ref())
                .map(scalar_text),
            Self::SingleValue(value) => Some(scalar_text(value)),
            Self::Weight(weight) => Some(weight.text()),
            Self::Dimensions(dims) => Some(format!(
                "{}, {}, {}",
                dims.length.text(),
                dims.width.text(),
                dims.height.text()
            )),
            Self::NodeList(names) => Some(
                names
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }
}

/// Every entry needs a `language_tag`; the first entry in the target
/// locale also needs a `value`.
fn parse_localized(value: &Value) -> Option<AttributeRecord> {
    let items = value.as_array()?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let object = item.as_object()?;
        entries.push(LocalizedEntry {
            language_tag: object.get("language_tag")?.clone(),
            value: object.get("value").cloned(),
        });
    }

    if let Some(target) = entries.iter().find(|entry| entry.is_target()) {
        target.value.as_ref()?;
    }

    Some(AttributeRecord::Localized(entries))
}

/// Every entry needs a `node_name` that is either a string or null.
fn parse_node_list(value: &Value) -> Option<AttributeRecord> {
    let names = value
        .as_array()?
        .iter()
        .map(|item| match item.as_object()?.get("node_name")? {
            Value::Null => Some(None),
            Value::String(name) => Some(Some(name.clone())),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    Some(AttributeRecord::NodeList(names))
}

/// Strings verbatim, anything else as JSON text
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome of a best-effort extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Extracted(String),
    /// Localized record without an entry in the target locale
    NoMatch,
    /// Input did not have the expected shape; carried back unchanged
    Unrecognized(Value),
}

impl Extraction {
    /// Collapse to a plain JSON value: the extracted string, `null` for no
    /// match, or the original input.
    pub fn into_value(self) -> Value {
        match self {
            Self::Extracted(text) => Value::String(text),
            Self::NoMatch => Value::Null,
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Extracted(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted(_))
    }
}

/// Extract display text from `value`, assuming it has the given shape.
pub fn extract(kind: AttributeKind, value: &Value) -> Extraction {
    match AttributeRecord::parse(kind, value) {
        Some(record) => match record.text() {
            Some(text) => Extraction::Extracted(text),
            None => Extraction::NoMatch,
        },
        None => Extraction::Unrecognized(value.clone()),
    }
}

/// Extract display text from `value`, inferring its shape.
pub fn extract_detected(value: &Value) -> Extraction {
    match AttributeRecord::detect(value) {
        Some(record) => match record.text() {
            Some(text) => Extraction::Extracted(text),
            None => Extraction::NoMatch,
        },
        None => Extraction::Unrecognized(value.clone()),
    }
}

/// Value of the `en_US` entry of a localized record.
pub fn extract_localized(value: &Value) -> Extraction {
    extract(AttributeKind::Localized, value)
}

/// First entry's value, as text.
pub fn extract_single_value(value: &Value) -> Extraction {
    extract(AttributeKind::SingleValue, value)
}

/// `"<value> <unit>"` of the first entry's normalized value.
pub fn extract_weight(value: &Value) -> Extraction {
    extract(AttributeKind::Weight, value)
}

/// `"<len> <unit>, <width> <unit>, <height> <unit>"`.
pub fn extract_dimensions(value: &Value) -> Extraction {
    extract(AttributeKind::Dimensions, value)
}

/// Non-null node names joined with commas.
pub fn extract_node_names(value: &Value) -> Extraction {
    extract(AttributeKind::NodeList, value)
}
