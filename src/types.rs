use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// Values that can be written to a Spanner row or used inside generated statements.
///
/// ```rust
/// use spanner_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Declared type a value gets when the caller does not name one.
    ///
    /// Textual values (text, timestamps, JSON) are string-like, blobs are binary-like and
    /// everything else is written as a bare literal.
    ///
    /// # Returns
    ///
    /// The declared type [`ValueEncoder`](crate::platform::ValueEncoder) implementations
    /// receive from the untyped quoting path.
    #[must_use]
    pub fn inferred_type(&self) -> ParameterType {
        match self {
            RowValues::Text(_) | RowValues::Timestamp(_) | RowValues::JSON(_) => {
                ParameterType::String
            }
            RowValues::Blob(_) => ParameterType::Binary,
            RowValues::Bool(_) => ParameterType::Boolean,
            RowValues::Null => ParameterType::Null,
            RowValues::Int(_) => ParameterType::Integer,
            RowValues::Float(_) => ParameterType::Float,
        }
    }

    /// Textual form of the value, without any quoting.
    ///
    /// Blobs are rendered as lowercase hex so no byte is lost; encoders that need the raw
    /// bytes match on [`RowValues::Blob`] directly.
    #[must_use]
    pub fn to_literal_text(&self) -> String {
        match self {
            RowValues::Int(value) => value.to_string(),
            RowValues::Float(value) => value.to_string(),
            RowValues::Text(value) => value.clone(),
            RowValues::Bool(value) => value.to_string(),
            RowValues::Timestamp(value) => value.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            RowValues::Null => "NULL".to_string(),
            RowValues::JSON(value) => value.to_string(),
            RowValues::Blob(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Declared type of a value being quoted into statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ParameterType {
    Null,
    Integer,
    Float,
    String,
    LargeObject,
    Boolean,
    Binary,
    Ascii,
}

impl ParameterType {
    /// Types whose literals are written as quoted text.
    #[must_use]
    pub fn is_string_like(self) -> bool {
        matches!(self, ParameterType::String | ParameterType::Ascii)
    }

    /// Types whose literals are written as quoted bytes.
    #[must_use]
    pub fn is_binary_like(self) -> bool {
        matches!(self, ParameterType::Binary | ParameterType::LargeObject)
    }
}

/// Column-name to value mapping that keeps insertion order.
///
/// Generated SET and WHERE clauses list columns in the order they were added.
///
/// ```rust
/// use spanner_middleware::prelude::*;
///
/// let row = ColumnValues::new()
///     .with("firstname", "ada")
///     .with("lastname", "lovelace");
/// assert_eq!(row.columns().collect::<Vec<_>>(), vec!["firstname", "lastname"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, RowValues)>,
}

impl ColumnValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set `column` to `value`. An existing column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<RowValues>) {
        let column = column.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            slot.1 = value;
        } else {
            self.entries.push((column, value));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = ColumnValues::new();
        for (column, value) in iter {
            values.insert(column, value);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_values_keep_insertion_order() {
        let values = ColumnValues::new()
            .with("b", RowValues::Int(2))
            .with("a", RowValues::Int(1))
            .with("b", RowValues::Int(3));
        let collected: Vec<_> = values.iter().collect();
        assert_eq!(
            collected,
            vec![("b", &RowValues::Int(3)), ("a", &RowValues::Int(1))]
        );
    }

    #[test]
    fn inferred_types_follow_value_shape() {
        assert_eq!(RowValues::Text("x".into()).inferred_type(), ParameterType::String);
        assert_eq!(RowValues::Blob(vec![1]).inferred_type(), ParameterType::Binary);
        assert_eq!(RowValues::Int(5).inferred_type(), ParameterType::Integer);
        assert_eq!(RowValues::Float(1.5).inferred_type(), ParameterType::Float);
        assert!(!ParameterType::Float.is_string_like());
    }

    #[test]
    fn blob_text_is_lossless_hex() {
        assert_eq!(
            RowValues::Blob(vec![0xde, 0xad, 0x00, 0x41]).to_literal_text(),
            "dead0041"
        );
    }

    #[test]
    fn option_none_becomes_null() {
        let value: RowValues = Option::<i64>::None.into();
        assert!(value.is_null());
    }
}
