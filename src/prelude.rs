//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::clause::{build_set_clause, build_where_clause};
pub use crate::client::{
    SpannerClient, SpannerClientFactory, SpannerDatabase, SpannerTransaction, TxFuture,
};
pub use crate::config::{Credentials, SpannerOptions, SpannerOptionsBuilder};
pub use crate::connection::{SpannerConnection, StatementOutcome};
pub use crate::ddl::is_ddl_statement;
pub use crate::driver::SpannerDriver;
pub use crate::error::SqlMiddlewareDbError;
pub use crate::platform::{SpannerPlatform, SpannerValueEncoder, ValueEncoder};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::statement::{SpannerStatement, StatementCache, StatementState};
pub use crate::types::{ColumnValues, ParameterType, RowValues};
