//! Identifier validation and quoting for dynamically built SQL.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! identifier that reaches a SQL string goes through [`quote_mysql`], which
//! validates it first and escapes embedded backticks.

use crate::error::{LoaderError, Result};

/// Maximum identifier length accepted by MySQL, in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate an identifier.
///
/// Rejects empty names, names containing null bytes, names ending in
/// whitespace (MySQL refuses those) and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] characters.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(LoaderError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(LoaderError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.ends_with(char::is_whitespace) {
        return Err(LoaderError::Config(format!(
            "Identifier cannot end with whitespace: {:?}",
            name
        )));
    }

    let len = name.chars().count();
    if len > MAX_IDENTIFIER_LENGTH {
        return Err(LoaderError::Config(format!(
            "Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, len, name
        )));
    }

    Ok(())
}

/// Quote a MySQL identifier with backticks.
///
/// ```
/// use csv_mysql_loader::core::identifier::quote_mysql;
/// assert_eq!(quote_mysql("users").unwrap(), "`users`");
/// assert_eq!(quote_mysql("table`name").unwrap(), "`table``name`");
/// ```
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Build a helper table name from `table` and `suffix`, truncating the
/// table part so the result stays within [`MAX_IDENTIFIER_LENGTH`].
pub fn derived_name(table: &str, suffix: &str) -> String {
    let keep = MAX_IDENTIFIER_LENGTH.saturating_sub(suffix.chars().count());
    let base: String = table.chars().take(keep).collect();
    format!("{}{}", base.trim_end(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_trailing_space() {
        assert!(validate_identifier("customers ").is_err());
    }

    #[test]
    fn test_validate_identifier_length_limit() {
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        let result = validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1));
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_quote_mysql_sql_injection_safely_quoted() {
        assert_eq!(
            quote_mysql("Robert`); DROP TABLE Students;--").unwrap(),
            "`Robert``); DROP TABLE Students;--`"
        );
    }

    #[test]
    fn test_derived_name_fits_limit() {
        assert_eq!(derived_name("orders", "__staging"), "orders__staging");
        let long = "x".repeat(MAX_IDENTIFIER_LENGTH);
        let staged = derived_name(&long, "__staging");
        assert_eq!(staged.chars().count(), MAX_IDENTIFIER_LENGTH);
        assert!(staged.ends_with("__staging"));
    }
}
