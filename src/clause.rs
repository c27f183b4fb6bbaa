use crate::platform::{SpannerPlatform, ValueEncoder};
use crate::types::ColumnValues;

/// Build the condition list of a WHERE clause, without the `WHERE` keyword.
///
/// Columns appear in insertion order joined with ` AND `. NULL values become the platform's
/// IS NULL expression. An empty map yields an empty string; callers decide whether that is
/// acceptable.
#[must_use]
pub fn build_where_clause(
    identifiers: &ColumnValues,
    encoder: &dyn ValueEncoder,
    platform: &SpannerPlatform,
) -> String {
    identifiers
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                platform.is_null_expression(column)
            } else {
                format!(
                    "{column} = {}",
                    encoder.encode(value, value.inferred_type())
                )
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Build the assignment list of an UPDATE, without the `SET` keyword.
#[must_use]
pub fn build_set_clause(data: &ColumnValues, encoder: &dyn ValueEncoder) -> String {
    data.iter()
        .map(|(column, value)| {
            format!(
                "{column} = {}",
                encoder.encode(value, value.inferred_type())
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
