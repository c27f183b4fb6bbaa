use crate::types::{ParameterType, RowValues};

/// SQL dialect capabilities the statement builders rely on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpannerPlatform;

impl SpannerPlatform {
    /// Condition matching rows where `column` is NULL.
    #[must_use]
    pub fn is_null_expression(&self, column: &str) -> String {
        format!("{column} IS NULL")
    }
}

/// Renders a value as a literal inside statement text, keyed by its declared type.
pub trait ValueEncoder: Send + Sync {
    fn encode(&self, value: &RowValues, declared: ParameterType) -> String;
}

/// Default encoder producing GoogleSQL literals.
///
/// String-like and binary-like declared types become double-quoted literals with `\`, `"` and
/// control characters escaped. Blob values always become `b"..."` bytes literals, with every
/// byte outside printable ASCII written as `\xNN`. Non-finite floats are written as a cast
/// from their string name. Every other value is written as its bare textual form.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpannerValueEncoder;

impl ValueEncoder for SpannerValueEncoder {
    fn encode(&self, value: &RowValues, declared: ParameterType) -> String {
        match value {
            RowValues::Blob(bytes) => bytes_literal(bytes),
            _ if declared.is_string_like() || declared.is_binary_like() => {
                string_literal(&value.to_literal_text())
            }
            RowValues::Float(f) if !f.is_finite() => non_finite_float(*f),
            _ => value.to_literal_text(),
        }
    }
}

fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn bytes_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b\"");
    for &byte in bytes {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('"');
    out
}

fn non_finite_float(value: f64) -> String {
    let name = if value.is_nan() {
        "nan"
    } else if value.is_sign_negative() {
        "-inf"
    } else {
        "inf"
    };
    format!("CAST(\"{name}\" AS FLOAT64)")
}
