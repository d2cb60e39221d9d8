/// Input validation for the engine's entry points
///
/// Queries arrive from an interactive shell or an embedding program;
/// these checks reject input that is empty, oversized or carries bytes
/// no statement or file name can contain.
use csvsql_core::error::{Error, Result};

/// Default ceiling on query text length (1 MB)
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1024 * 1024;

const MAX_TABLE_NAME_LENGTH: usize = 256;

/// Validates query text
///
/// # Errors
///
/// Returns `Error::InvalidInput` for empty or whitespace-only text, text
/// longer than `max_length` bytes, or text containing NUL bytes.
#[inline]
pub fn validate_query(query: &str, max_length: usize) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("Query cannot be empty".to_string()));
    }

    if query.len() > max_length {
        return Err(Error::InvalidInput(format!(
            "Query length {} exceeds maximum {}",
            query.len(),
            max_length
        )));
    }

    if query.contains('\0') {
        return Err(Error::InvalidInput(
            "Query cannot contain null bytes".to_string(),
        ));
    }

    Ok(())
}

/// Validates a table name passed through the API rather than a LOAD
/// statement
///
/// # Errors
///
/// Returns `Error::InvalidInput` unless the name is a plain identifier:
/// a letter or `_` followed by letters, digits or `_`. Dots are refused so
/// that `table.column` stays unambiguous.
#[inline]
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Table name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_TABLE_NAME_LENGTH {
        return Err(Error::InvalidInput(format!(
            "Table name length {} exceeds maximum {}",
            name.len(),
            MAX_TABLE_NAME_LENGTH
        )));
    }

    let mut chars = name.chars();
    let leading = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !leading || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidInput(format!(
            "Table name '{}' must be an identifier",
            name
        )));
    }

    Ok(())
}
