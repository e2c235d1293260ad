//! Record and field value types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Field map of a record, ordered by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single Airtable cell value.
///
/// Deserialization is untagged: the JSON shape decides the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// An empty cell. Sent on write to clear a field.
    Null,
    /// A checkbox.
    Bool(bool),
    /// A number, currency, percent or rating cell.
    Number(serde_json::Number),
    /// A text, date or single-select cell.
    Text(String),
    /// A multi-select, attachment or linked-record cell.
    List(Vec<FieldValue>),
    /// A structured cell such as a collaborator or an attachment entry.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the text content if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the numeric content.
    ///
    /// Text cells holding a plain number (optionally with `$` and `,`) are
    /// parsed as well, since currency columns are often stored as text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            Self::Text(text) => {
                let cleaned: String = text
                    .trim()
                    .chars()
                    .filter(|c| *c != '$' && *c != ',')
                    .collect();
                cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Returns the checkbox value if this is a boolean cell.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` for null, whitespace-only text and empty collections.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
            Self::List(items) => {
                for (i, item) in items.iter().filter(|item| !item.is_blank()).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(entries) => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value).into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(u64::from(value).into())
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Number(u64::from(value).into())
    }
}

/// Non-finite floats have no JSON representation and become `Null`.
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// A record as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque record id assigned by the store.
    pub id: String,
    /// Cell values. Empty cells are omitted by the server.
    #[serde(default)]
    pub fields: Fields,
    /// Creation timestamp echoed by the server.
    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<String>,
}

impl Record {
    /// Creates a record with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
            created_time: None,
        }
    }

    /// Adds a field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the value of a field, if present.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns `true` if the field is missing or blank.
    pub fn is_blank(&self, name: &str) -> bool {
        self.field(name).is_none_or(FieldValue::is_blank)
    }
}

/// A pending update of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    /// Id of the record to update.
    pub id: String,
    /// Fields to overwrite. Fields not listed are left untouched.
    pub fields: Fields,
}

impl RecordPatch {
    /// Creates an empty patch for the given record.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
        }
    }

    /// Adds a field to overwrite.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_record_deserializes_mixed_fields() {
        let record: Record = serde_json::from_value(json!({
            "id": "rec1",
            "createdTime": "2024-01-02T03:04:05.000Z",
            "fields": {
                "Address": "12 Elm St",
                "Beds": 3,
                "Vacant": true,
                "Tags": ["absentee", "tax lien"],
                "Owner": {"name": "Pat"},
                "Notes": null
            }
        }))
        .unwrap();

        assert_eq!(record.id, "rec1");
        assert_eq!(record.created_time.as_deref(), Some("2024-01-02T03:04:05.000Z"));
        assert_eq!(record.field("Address").and_then(FieldValue::as_str), Some("12 Elm St"));
        assert_eq!(record.field("Beds").and_then(FieldValue::as_f64), Some(3.0));
        assert_eq!(record.field("Vacant").and_then(FieldValue::as_bool), Some(true));
        assert_eq!(record.field("Tags").unwrap().to_string(), "absentee, tax lien");
        assert_eq!(record.field("Owner").unwrap().to_string(), "name: Pat");
        assert!(record.is_blank("Notes"));
        assert!(record.is_blank("Missing"));
    }

    #[test]
    fn test_record_without_fields() {
        let record: Record = serde_json::from_value(json!({"id": "rec2"})).unwrap();
        assert!(record.fields.is_empty());
        assert!(record.created_time.is_none());
    }

    #[test]
    fn test_currency_text_parses_as_number() {
        assert_eq!(FieldValue::from("$250,000").as_f64(), Some(250_000.0));
        assert_eq!(FieldValue::from("n/a").as_f64(), None);
    }

    #[test]
    fn test_blank_values() {
        assert!(FieldValue::Null.is_blank());
        assert!(FieldValue::from("  ").is_blank());
        assert!(FieldValue::List(Vec::new()).is_blank());
        assert!(!FieldValue::from(0).is_blank());
        assert!(!FieldValue::from(false).is_blank());
    }

    #[test]
    fn test_patch_serializes_null_to_clear() {
        let patch = RecordPatch::new("rec1")
            .with_field("Motivation Score", 42)
            .with_field("Suggested Offer", Option::<f64>::None);

        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"id": "rec1", "fields": {"Motivation Score": 42, "Suggested Offer": null}})
        );
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(FieldValue::from(f64::NAN), FieldValue::Null);
        assert_eq!(FieldValue::from(1.5).as_f64(), Some(1.5));
    }
}
