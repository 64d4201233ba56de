//! Column configuration and resolved table schema types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// User-facing column type chosen in the column configuration.
///
/// Parsed case-insensitively. Names outside the supported set are kept in
/// [`LogicalType::Other`] so the resolver can fall back explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogicalType {
    #[default]
    Varchar,
    Text,
    MediumText,
    LongText,
    Int,
    BigInt,
    Float,
    Decimal,
    Date,
    DateTime,
    Boolean,
    /// Unrecognized type name, resolved to the string fallback.
    Other(String),
}

impl LogicalType {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &str {
        match self {
            LogicalType::Varchar => "VARCHAR",
            LogicalType::Text => "TEXT",
            LogicalType::MediumText => "MEDIUMTEXT",
            LogicalType::LongText => "LONGTEXT",
            LogicalType::Int => "INT",
            LogicalType::BigInt => "BIGINT",
            LogicalType::Float => "FLOAT",
            LogicalType::Decimal => "DECIMAL",
            LogicalType::Date => "DATE",
            LogicalType::DateTime => "DATETIME",
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::Other(name) => name,
        }
    }
}

impl From<&str> for LogicalType {
    fn from(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "VARCHAR" => LogicalType::Varchar,
            "TEXT" => LogicalType::Text,
            "MEDIUMTEXT" => LogicalType::MediumText,
            "LONGTEXT" => LogicalType::LongText,
            "INT" => LogicalType::Int,
            "BIGINT" => LogicalType::BigInt,
            "FLOAT" => LogicalType::Float,
            "DECIMAL" => LogicalType::Decimal,
            "DATE" => LogicalType::Date,
            "DATETIME" => LogicalType::DateTime,
            "BOOLEAN" => LogicalType::Boolean,
            _ => LogicalType::Other(name.trim().to_string()),
        }
    }
}

impl From<String> for LogicalType {
    fn from(name: String) -> Self {
        LogicalType::from(name.as_str())
    }
}

impl From<LogicalType> for String {
    fn from(t: LogicalType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-load update requested for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateDirective {
    #[default]
    None,
    /// Prefix values that do not start with `0` with a `0`.
    #[serde(alias = "phone", alias = "update_phone")]
    NormalizeLeadingZero,
    /// Left-pad values with `0` to 8 characters.
    #[serde(alias = "crn", alias = "update_crn")]
    ZeroPadFixedWidth,
}

/// Per-column configuration as supplied by the user.
///
/// Numeric modifiers are kept as raw text; the resolver decides what to do
/// with values that do not parse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name as it appears in the dataset header.
    pub name: String,

    /// Logical type (default: VARCHAR).
    #[serde(rename = "type", default)]
    pub logical_type: LogicalType,

    /// VARCHAR length.
    #[serde(default, deserialize_with = "raw_modifier", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Combined DECIMAL "precision,scale" token.
    #[serde(default, deserialize_with = "raw_modifier", skip_serializing_if = "Option::is_none")]
    pub precision_scale: Option<String>,

    /// DECIMAL precision, used when no combined token is given.
    #[serde(default, deserialize_with = "raw_modifier", skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,

    /// DECIMAL scale, used when no combined token is given.
    #[serde(default, deserialize_with = "raw_modifier", skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,

    /// Post-load update directive.
    #[serde(default)]
    pub update: UpdateDirective,
}

impl ColumnSpec {
    /// Create a spec with the given name and type and no modifiers.
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            ..Default::default()
        }
    }

    /// Default spec for dataset columns without configuration.
    pub fn default_for(name: impl Into<String>) -> Self {
        Self::new(name, LogicalType::Varchar)
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_precision_scale(mut self, token: impl Into<String>) -> Self {
        self.precision_scale = Some(token.into());
        self
    }

    pub fn with_update(mut self, update: UpdateDirective) -> Self {
        self.update = update;
        self
    }
}

/// Accept YAML numbers or strings for a modifier and keep the raw text.
fn raw_modifier<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Text(s) => s,
    }))
}

/// Concrete column type created in the destination store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConcreteType {
    BoundedString(u32),
    Text,
    Int32,
    Int64,
    Float,
    FixedPoint { precision: u32, scale: u32 },
    Date,
    DateTime,
    Boolean,
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteType::BoundedString(len) => write!(f, "VARCHAR({})", len),
            ConcreteType::Text => f.write_str("TEXT"),
            ConcreteType::Int32 => f.write_str("INT"),
            ConcreteType::Int64 => f.write_str("BIGINT"),
            ConcreteType::Float => f.write_str("DOUBLE"),
            ConcreteType::FixedPoint { precision, scale } => {
                write!(f, "DECIMAL({},{})", precision, scale)
            }
            ConcreteType::Date => f.write_str("DATE"),
            ConcreteType::DateTime => f.write_str("DATETIME"),
            ConcreteType::Boolean => f.write_str("BOOLEAN"),
        }
    }
}

impl Serialize for ConcreteType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A column with its resolved destination type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub db_type: ConcreteType,
}

/// Ordered set of resolved columns for one destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ResolvedColumn>,
}

impl TableSchema {
    /// Column names in destination order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The same columns under another table name.
    pub fn renamed(&self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: self.columns.clone(),
        }
    }
}

/// Kind of post-load update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    NormalizeLeadingZero,
    ZeroPadFixedWidth,
}

impl UpdateKind {
    /// Width used by [`UpdateKind::ZeroPadFixedWidth`].
    pub const PAD_WIDTH: usize = 8;
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateKind::NormalizeLeadingZero => f.write_str("normalize_leading_zero"),
            UpdateKind::ZeroPadFixedWidth => f.write_str("zero_pad_fixed_width"),
        }
    }
}

/// One update to run against the loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UpdateCommand {
    pub target_column: String,
    pub kind: UpdateKind,
}

impl UpdateCommand {
    pub fn new(target_column: impl Into<String>, kind: UpdateKind) -> Self {
        Self {
            target_column: target_column.into(),
            kind,
        }
    }

    /// Command for a directive, or `None` for [`UpdateDirective::None`].
    pub fn from_directive(column: &str, directive: UpdateDirective) -> Option<Self> {
        match directive {
            UpdateDirective::None => None,
            UpdateDirective::NormalizeLeadingZero => {
                Some(Self::new(column, UpdateKind::NormalizeLeadingZero))
            }
            UpdateDirective::ZeroPadFixedWidth => {
                Some(Self::new(column, UpdateKind::ZeroPadFixedWidth))
            }
        }
    }
}

impl fmt::Display for UpdateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.kind, self.target_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_type_parse_is_case_insensitive() {
        assert_eq!(LogicalType::from("varchar"), LogicalType::Varchar);
        assert_eq!(LogicalType::from(" MediumText "), LogicalType::MediumText);
        assert_eq!(LogicalType::from("DateTime"), LogicalType::DateTime);
        assert_eq!(
            LogicalType::from("GEOMETRY"),
            LogicalType::Other("GEOMETRY".to_string())
        );
    }

    #[test]
    fn test_column_spec_yaml_accepts_numbers_and_strings() {
        let yaml = r#"
- name: code
  type: varchar
  size: 12
- name: amount
  type: DECIMAL
  precision_scale: "12,4"
- name: phone
  update: update_phone
- name: crn
  size: "abc"
  update: zero_pad_fixed_width
"#;
        let specs: Vec<ColumnSpec> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(specs[0].logical_type, LogicalType::Varchar);
        assert_eq!(specs[0].size.as_deref(), Some("12"));
        assert_eq!(specs[1].precision_scale.as_deref(), Some("12,4"));
        assert_eq!(specs[2].logical_type, LogicalType::Varchar);
        assert_eq!(specs[2].update, UpdateDirective::NormalizeLeadingZero);
        assert_eq!(specs[3].size.as_deref(), Some("abc"));
        assert_eq!(specs[3].update, UpdateDirective::ZeroPadFixedWidth);
    }

    #[test]
    fn test_concrete_type_ddl() {
        assert_eq!(ConcreteType::BoundedString(20).to_string(), "VARCHAR(20)");
        assert_eq!(
            ConcreteType::FixedPoint {
                precision: 10,
                scale: 2
            }
            .to_string(),
            "DECIMAL(10,2)"
        );
        assert_eq!(ConcreteType::Float.to_string(), "DOUBLE");
    }

    #[test]
    fn test_update_command_from_directive() {
        assert!(UpdateCommand::from_directive("a", UpdateDirective::None).is_none());
        let cmd = UpdateCommand::from_directive("crn", UpdateDirective::ZeroPadFixedWidth).unwrap();
        assert_eq!(cmd.kind, UpdateKind::ZeroPadFixedWidth);
        assert_eq!(cmd.to_string(), "zero_pad_fixed_width on crn");
    }
}
