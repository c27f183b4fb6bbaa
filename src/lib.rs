//! Relational middleware for Cloud Spanner.
//!
//! Spanner does not speak the wire protocol a generic relational layer expects, so this crate
//! sits in between: it rewrites `insert`/`update`/`delete`/`exec`/`query` calls into the native
//! client's primitives, runs mutating SQL inside a single atomic transaction, and quotes values
//! into GoogleSQL literals. The native client itself is supplied by the caller through the
//! traits in [`client`].
//!
//! ```rust,ignore
//! use spanner_middleware::prelude::*;
//!
//! let mut driver = SpannerDriver::new(my_client_factory);
//! let conn = driver
//!     .connect(&SpannerOptions::new("prod-instance".into(), "orders".into()))
//!     .await?;
//! conn.delete("users", &ColumnValues::new().with("id", 1)).await?;
//! ```

pub mod clause;
pub mod client;
pub mod config;
pub mod connection;
pub mod ddl;
pub mod driver;
pub mod error;
pub mod platform;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::SqlMiddlewareDbError;
pub use types::{ColumnValues, ParameterType, RowValues};
