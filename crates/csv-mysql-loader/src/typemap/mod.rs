//! Resolution of configured logical column types into MySQL column types.
//!
//! Resolution never fails: malformed modifiers fall back to the type's
//! defaults and unknown type names fall back to `VARCHAR(255)`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::schema::{
    ColumnSpec, ConcreteType, LogicalType, ResolvedColumn, TableSchema, UpdateCommand,
};

/// VARCHAR length used when no valid size is configured.
pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// DECIMAL precision and scale used when none are configured.
pub const DEFAULT_DECIMAL: (u32, u32) = (10, 2);

/// Length forced on columns whose name mentions a phone number.
pub const PHONE_COLUMN_LENGTH: u32 = 20;

const MYSQL_MAX_DECIMAL_PRECISION: u32 = 65;
const MYSQL_MAX_DECIMAL_SCALE: u32 = 30;

/// Resolve one column spec.
pub fn resolve(spec: &ColumnSpec) -> ResolvedColumn {
    let mut db_type = match &spec.logical_type {
        LogicalType::Varchar => ConcreteType::BoundedString(varchar_length(spec)),
        LogicalType::Decimal => {
            let (precision, scale) = decimal_precision_scale(spec);
            ConcreteType::FixedPoint { precision, scale }
        }
        LogicalType::Text | LogicalType::MediumText | LogicalType::LongText => {
            ConcreteType::Text
        }
        LogicalType::Int => ConcreteType::Int32,
        LogicalType::BigInt => ConcreteType::Int64,
        LogicalType::Float => ConcreteType::Float,
        LogicalType::Date => ConcreteType::Date,
        LogicalType::DateTime => ConcreteType::DateTime,
        LogicalType::Boolean => ConcreteType::Boolean,
        LogicalType::Other(name) => {
            warn!(
                "Unknown type '{}' for column '{}', using VARCHAR({})",
                name, spec.name, DEFAULT_VARCHAR_LENGTH
            );
            ConcreteType::BoundedString(DEFAULT_VARCHAR_LENGTH)
        }
    };

    if is_phone_column(&spec.name) {
        let phone_type = ConcreteType::BoundedString(PHONE_COLUMN_LENGTH);
        if db_type != phone_type {
            debug!(
                "Column '{}': phone column, {} overridden to {}",
                spec.name, db_type, phone_type
            );
        }
        db_type = phone_type;
    }

    ResolvedColumn {
        name: spec.name.clone(),
        db_type,
    }
}

/// Resolve all specs into a schema for `table`.
///
/// A repeated column name keeps its first occurrence.
pub fn resolve_all(table: &str, specs: &[ColumnSpec]) -> TableSchema {
    let mut seen = HashSet::new();
    let columns = specs
        .iter()
        .filter(|spec| {
            let first = seen.insert(spec.name.as_str());
            if !first {
                warn!("Duplicate column '{}' ignored, first entry wins", spec.name);
            }
            first
        })
        .map(resolve)
        .collect();

    TableSchema {
        table: table.to_string(),
        columns,
    }
}

/// Pair each dataset column with its configuration.
///
/// The result follows dataset column order. Columns without configuration
/// get the default VARCHAR spec; configuration for columns the dataset does
/// not have is ignored.
pub fn plan_columns(dataset_columns: &[String], specs: &[ColumnSpec]) -> Vec<ColumnSpec> {
    for spec in specs {
        if !dataset_columns.contains(&spec.name) {
            warn!(
                "Column '{}' is configured but not present in the dataset, ignoring",
                spec.name
            );
        }
    }

    dataset_columns
        .iter()
        .map(|name| {
            specs
                .iter()
                .find(|spec| &spec.name == name)
                .cloned()
                .unwrap_or_else(|| ColumnSpec::default_for(name.clone()))
        })
        .collect()
}

/// Update commands for every spec with a directive, in declaration order.
///
/// Follows the same first-occurrence rule as [`resolve_all`].
pub fn build_update_commands(specs: &[ColumnSpec]) -> Vec<UpdateCommand> {
    let mut seen = HashSet::new();
    specs
        .iter()
        .filter(|spec| seen.insert(spec.name.as_str()))
        .filter_map(|spec| UpdateCommand::from_directive(&spec.name, spec.update))
        .collect()
}

/// Whether a column name mentions a phone number.
pub fn is_phone_column(name: &str) -> bool {
    name.to_lowercase().contains("phone")
}

fn varchar_length(spec: &ColumnSpec) -> u32 {
    match spec.size.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_VARCHAR_LENGTH,
        Some(raw) => raw.parse::<u32>().unwrap_or_else(|_| {
            debug!(
                "Column '{}': invalid size {:?}, using {}",
                spec.name, raw, DEFAULT_VARCHAR_LENGTH
            );
            DEFAULT_VARCHAR_LENGTH
        }),
    }
}

fn decimal_precision_scale(spec: &ColumnSpec) -> (u32, u32) {
    let parsed = match (
        spec.precision_scale.as_deref().map(str::trim),
        spec.precision.as_deref(),
        spec.scale.as_deref(),
    ) {
        (Some(token), _, _) if !token.is_empty() => parse_precision_scale(token),
        (_, Some(precision), Some(scale)) => parse_pair(precision, scale),
        _ => return DEFAULT_DECIMAL,
    };

    match parsed {
        Some((precision, scale)) if is_valid_decimal(precision, scale) => (precision, scale),
        _ => {
            debug!(
                "Column '{}': invalid precision/scale, using ({}, {})",
                spec.name, DEFAULT_DECIMAL.0, DEFAULT_DECIMAL.1
            );
            DEFAULT_DECIMAL
        }
    }
}

fn parse_precision_scale(token: &str) -> Option<(u32, u32)> {
    let (precision, scale) = token.split_once(',')?;
    parse_pair(precision, scale)
}

fn parse_pair(precision: &str, scale: &str) -> Option<(u32, u32)> {
    Some((precision.trim().parse().ok()?, scale.trim().parse().ok()?))
}

fn is_valid_decimal(precision: u32, scale: u32) -> bool {
    (1..=MYSQL_MAX_DECIMAL_PRECISION).contains(&precision)
        && scale <= MYSQL_MAX_DECIMAL_SCALE
        && scale <= precision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{UpdateDirective, UpdateKind};

    fn spec(name: &str, t: LogicalType) -> ColumnSpec {
        ColumnSpec::new(name, t)
    }

    #[test]
    fn test_varchar_size() {
        let col = resolve(&spec("code", LogicalType::Varchar).with_size("40"));
        assert_eq!(col.db_type, ConcreteType::BoundedString(40));

        let col = resolve(&spec("code", LogicalType::Varchar).with_size("0"));
        assert_eq!(col.db_type, ConcreteType::BoundedString(0));
    }

    #[test]
    fn test_varchar_invalid_size_defaults() {
        for raw in ["", "abc", "-5", "12.5", "  "] {
            let col = resolve(&spec("code", LogicalType::Varchar).with_size(raw));
            assert_eq!(col.db_type, ConcreteType::BoundedString(255), "size {raw:?}");
        }
        let col = resolve(&spec("code", LogicalType::Varchar));
        assert_eq!(col.db_type, ConcreteType::BoundedString(255));
    }

    #[test]
    fn test_decimal_token() {
        let col = resolve(&spec("amount", LogicalType::Decimal).with_precision_scale("12, 4"));
        assert_eq!(
            col.db_type,
            ConcreteType::FixedPoint {
                precision: 12,
                scale: 4
            }
        );
    }

    #[test]
    fn test_decimal_defaults_when_absent_or_malformed() {
        let default = ConcreteType::FixedPoint {
            precision: 10,
            scale: 2,
        };
        assert_eq!(resolve(&spec("a", LogicalType::Decimal)).db_type, default);
        for token in ["12", "x,2", "12,y", "5,7", "0,0", "70,2"] {
            let col = resolve(&spec("a", LogicalType::Decimal).with_precision_scale(token));
            assert_eq!(col.db_type, default, "token {token:?}");
        }
    }

    #[test]
    fn test_decimal_separate_fields() {
        let mut s = spec("a", LogicalType::Decimal);
        s.precision = Some("8".into());
        s.scale = Some("3".into());
        assert_eq!(
            resolve(&s).db_type,
            ConcreteType::FixedPoint {
                precision: 8,
                scale: 3
            }
        );
    }

    #[test]
    fn test_modifiers_ignored_for_other_types() {
        let col = resolve(&spec("n", LogicalType::Int).with_size("abc"));
        assert_eq!(col.db_type, ConcreteType::Int32);
        let col = resolve(&spec("v", LogicalType::Varchar).with_precision_scale("x"));
        assert_eq!(col.db_type, ConcreteType::BoundedString(255));
    }

    #[test]
    fn test_text_variants_collapse() {
        for t in [LogicalType::Text, LogicalType::MediumText, LogicalType::LongText] {
            assert_eq!(resolve(&spec("notes", t)).db_type, ConcreteType::Text);
        }
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(resolve(&spec("a", LogicalType::BigInt)).db_type, ConcreteType::Int64);
        assert_eq!(resolve(&spec("a", LogicalType::Float)).db_type, ConcreteType::Float);
        assert_eq!(resolve(&spec("a", LogicalType::Date)).db_type, ConcreteType::Date);
        assert_eq!(
            resolve(&spec("a", LogicalType::DateTime)).db_type,
            ConcreteType::DateTime
        );
        assert_eq!(
            resolve(&spec("a", LogicalType::Boolean)).db_type,
            ConcreteType::Boolean
        );
    }

    #[test]
    fn test_unknown_type_falls_back_to_varchar() {
        let col = resolve(&spec("geo", LogicalType::Other("GEOMETRY".into())));
        assert_eq!(col.db_type, ConcreteType::BoundedString(255));
    }

    #[test]
    fn test_phone_override_beats_any_type() {
        for (name, t) in [
            ("phone", LogicalType::Varchar),
            ("Mobile_Phone", LogicalType::Int),
            ("HOMEPHONE", LogicalType::Decimal),
            ("phone_notes", LogicalType::Text),
        ] {
            assert_eq!(
                resolve(&spec(name, t)).db_type,
                ConcreteType::BoundedString(20),
                "{name}"
            );
        }
        let col = resolve(&spec("phone", LogicalType::Varchar).with_size("10"));
        assert_eq!(col.db_type, ConcreteType::BoundedString(20));
    }

    #[test]
    fn test_resolve_all_first_occurrence_wins() {
        let specs = vec![
            spec("id", LogicalType::Int),
            spec("name", LogicalType::Varchar).with_size("50"),
            spec("id", LogicalType::Text),
        ];
        let schema = resolve_all("people", &specs);
        assert_eq!(schema.table, "people");
        assert_eq!(schema.column_names(), vec!["id", "name"]);
        assert_eq!(schema.columns[0].db_type, ConcreteType::Int32);
    }

    #[test]
    fn test_plan_columns_follows_dataset_order() {
        let dataset = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let specs = vec![
            spec("c", LogicalType::Int),
            spec("a", LogicalType::Date),
            spec("missing", LogicalType::Int),
        ];
        let planned = plan_columns(&dataset, &specs);
        let names: Vec<_> = planned.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(planned[0].logical_type, LogicalType::Date);
        assert_eq!(planned[1].logical_type, LogicalType::Varchar);
        assert_eq!(planned[2].logical_type, LogicalType::Int);
    }

    #[test]
    fn test_build_update_commands_in_declaration_order() {
        let specs = vec![
            spec("crn", LogicalType::Varchar).with_update(UpdateDirective::ZeroPadFixedWidth),
            spec("name", LogicalType::Varchar),
            spec("phone", LogicalType::Varchar).with_update(UpdateDirective::NormalizeLeadingZero),
        ];
        let commands = build_update_commands(&specs);
        assert_eq!(
            commands,
            vec![
                UpdateCommand::new("crn", UpdateKind::ZeroPadFixedWidth),
                UpdateCommand::new("phone", UpdateKind::NormalizeLeadingZero),
            ]
        );
    }
}
