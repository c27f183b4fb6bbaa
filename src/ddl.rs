use std::sync::LazyLock;

use regex::Regex;

static DDL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:CREATE|DROP|ALTER) ").expect("DDL prefix pattern is valid")
});

/// True when `sql` starts with `CREATE `, `DROP ` or `ALTER ` after leading whitespace,
/// ignoring case.
///
/// Other schema statements (`TRUNCATE`, `COMMENT ON`, ...) are not recognised.
#[must_use]
pub fn is_ddl_statement(sql: &str) -> bool {
    DDL_PREFIX.is_match(sql)
}
