//! Declared schema model — the table shapes the live database is reconciled against.
//!
//! Tables follow the usual ORM conventions:
//! - a table without a declared primary key gets an implicit auto-increment `id`,
//! - `timestamps` (on by default) adds `createdAt` / `updatedAt` columns.
//!
//! Schemas are built in code with the builder methods or loaded from TOML:
//!
//! ```toml
//! [[tables]]
//! name = "products"
//!
//! [[tables.columns]]
//! name = "name"
//! type = "string"
//! length = 120
//! nullable = false
//! ```
//!
//! Unknown keys are rejected, so a misspelled `nulable` fails to load instead
//! of silently leaving the column nullable.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::SchemaError;

pub const IMPLICIT_ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

const DEFAULT_STRING_LENGTH: u32 = 255;

// ============================================================
// Column types
// ============================================================

/// Column data type, rendered in MySQL syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    BigInteger,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    String {
        #[serde(default = "default_string_length")]
        length: u32,
    },
    Text,
    DateTime,
    Date,
    Json,
    Uuid,
    Enum { values: Vec<String> },
}

fn default_string_length() -> u32 {
    DEFAULT_STRING_LENGTH
}

impl ColumnType {
    /// Type as written in DDL.
    pub fn sql(&self) -> String {
        match self {
            Self::Integer => "INTEGER".into(),
            Self::BigInteger => "BIGINT".into(),
            Self::Float => "FLOAT".into(),
            Self::Double => "DOUBLE".into(),
            Self::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            Self::Boolean => "TINYINT(1)".into(),
            Self::String { length } => format!("VARCHAR({length})"),
            Self::Text => "TEXT".into(),
            Self::DateTime => "DATETIME".into(),
            Self::Date => "DATE".into(),
            Self::Json => "JSON".into(),
            Self::Uuid => "CHAR(36) BINARY".into(),
            Self::Enum { values } => format!("ENUM({})", quoted_list(values)),
        }
    }

    /// Type as MySQL reports it in `information_schema.COLUMNS.COLUMN_TYPE`,
    /// lower-cased and without integer display widths.
    pub fn normalized(&self) -> String {
        match self {
            Self::Integer => "int".into(),
            Self::BigInteger => "bigint".into(),
            Self::Float => "float".into(),
            Self::Double => "double".into(),
            Self::Decimal { precision, scale } => format!("decimal({precision},{scale})"),
            Self::Boolean => "tinyint(1)".into(),
            Self::String { length } => format!("varchar({length})"),
            Self::Text => "text".into(),
            Self::DateTime => "datetime".into(),
            Self::Date => "date".into(),
            Self::Json => "json".into(),
            Self::Uuid => "char(36)".into(),
            Self::Enum { values } => format!("enum({})", quoted_list(values)).to_ascii_lowercase(),
        }
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_literal(v))
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================
// Defaults
// ============================================================

/// Column default. A text value of `CURRENT_TIMESTAMP` is emitted unquoted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl DefaultValue {
    pub fn sql(&self) -> String {
        match self {
            Self::Bool(true) => "1".into(),
            Self::Bool(false) => "0".into(),
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) if is_current_timestamp(s) => "CURRENT_TIMESTAMP".into(),
            Self::Text(s) => quote_literal(s),
        }
    }

    /// Whether `reported` (an unquoted `COLUMN_DEFAULT`) denotes this value.
    pub fn matches_reported(&self, reported: &str) -> bool {
        match self {
            Self::Text(s) if is_current_timestamp(s) => is_current_timestamp(reported),
            Self::Text(s) => s == reported,
            Self::Bool(b) => match reported.to_ascii_lowercase().as_str() {
                "1" | "true" | "b'1'" => *b,
                "0" | "false" | "b'0'" => !*b,
                _ => false,
            },
            Self::Integer(n) => reported.parse::<f64>().is_ok_and(|v| v == *n as f64),
            Self::Float(f) => reported.parse::<f64>().is_ok_and(|v| v == *f),
        }
    }
}

pub(crate) fn is_current_timestamp(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "current_timestamp" | "current_timestamp()" | "now()"
    )
}

// ============================================================
// Columns & tables
// ============================================================

/// One declared column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    #[serde(default = "yes")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Applied when the column is created; not reconciled afterwards.
    #[serde(default)]
    pub unique: bool,
}

fn yes() -> bool {
    true
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Primary key columns are always NOT NULL in MySQL, whatever was declared.
    pub fn is_nullable(&self) -> bool {
        self.nullable && !self.primary_key
    }

    /// Column definition without the name. `with_constraints` adds the
    /// `UNIQUE` clause, which only makes sense when the column is created.
    pub fn definition(&self, with_constraints: bool) -> String {
        let mut sql = self.column_type.sql();
        if !self.is_nullable() {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.sql());
        }
        if self.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if with_constraints && self.unique && !self.primary_key {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

/// One declared table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default = "yes")]
    pub timestamps: bool,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            timestamps: true,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Declared columns plus the implicit `id` and timestamp columns, in table order.
    pub fn effective_columns(&self) -> Vec<ColumnDef> {
        let mut columns = Vec::with_capacity(self.columns.len() + 3);

        if !self.columns.iter().any(|c| c.primary_key) && !self.has_column(IMPLICIT_ID) {
            columns.push(
                ColumnDef::new(IMPLICIT_ID, ColumnType::Integer)
                    .not_null()
                    .primary_key()
                    .auto_increment(),
            );
        }
        columns.extend(self.columns.iter().cloned());

        if self.timestamps {
            for name in [CREATED_AT, UPDATED_AT] {
                if !self.has_column(name) {
                    columns.push(ColumnDef::new(name, ColumnType::DateTime).not_null());
                }
            }
        }
        columns
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for the full table.
    pub fn create_sql(&self) -> String {
        let columns = self.effective_columns();
        let mut parts: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.definition(true)))
            .collect();

        let keys: Vec<String> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| quote_ident(&c.name))
            .collect();
        if !keys.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE=InnoDB",
            quote_ident(&self.name),
            parts.join(", ")
        )
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |message: String| SchemaError::Invalid {
            table: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("table name cannot be empty".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(invalid("column name cannot be empty".into()));
            }
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(invalid(format!("column `{}` is declared twice", column.name)));
            }
            match &column.column_type {
                ColumnType::Decimal { precision, scale } if scale > precision || *precision == 0 => {
                    return Err(invalid(format!(
                        "column `{}` has an impossible DECIMAL({precision},{scale})",
                        column.name
                    )));
                }
                ColumnType::Enum { values } if values.is_empty() => {
                    return Err(invalid(format!("column `{}` has no enum values", column.name)));
                }
                ColumnType::String { length: 0 } => {
                    return Err(invalid(format!("column `{}` has zero length", column.name)));
                }
                _ => {}
            }
        }

        let auto: Vec<&ColumnDef> = self.columns.iter().filter(|c| c.auto_increment).collect();
        if auto.len() > 1 {
            return Err(invalid("only one AUTO_INCREMENT column is allowed".into()));
        }
        if let Some(column) = auto.first() {
            if !column.primary_key && !column.unique {
                return Err(invalid(format!(
                    "AUTO_INCREMENT column `{}` must be a key",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================
// Schema
// ============================================================

/// The full set of declared tables, synchronized in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse and validate a TOML schema document.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaError> {
        check_column_keys(&toml::from_str(source)?)?;
        let schema: Schema = toml::from_str(source)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read, parse and validate a TOML schema file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.to_ascii_lowercase()) {
                return Err(SchemaError::Invalid {
                    table: table.name.clone(),
                    message: "table is declared twice".into(),
                });
            }
        }
        Ok(())
    }
}

/// Keys a `[[tables.columns]]` entry may carry, type parameters included.
const COLUMN_KEYS: &[&str] = &[
    "name",
    "type",
    "nullable",
    "default",
    "primary_key",
    "auto_increment",
    "unique",
    "length",
    "precision",
    "scale",
    "values",
];

/// `ColumnDef` flattens its type, which rules out `deny_unknown_fields`, so
/// column keys are checked against the raw document.
fn check_column_keys(document: &toml::Table) -> Result<(), SchemaError> {
    let tables = document.get("tables").and_then(toml::Value::as_array);
    for table in tables.into_iter().flatten().filter_map(toml::Value::as_table) {
        let columns = table.get("columns").and_then(toml::Value::as_array);
        for column in columns.into_iter().flatten().filter_map(toml::Value::as_table) {
            if let Some(key) = column.keys().find(|k| !COLUMN_KEYS.contains(&k.as_str())) {
                let name = |t: &toml::Table| {
                    t.get("name").and_then(toml::Value::as_str).unwrap_or("?").to_string()
                };
                return Err(SchemaError::Invalid {
                    table: name(table),
                    message: format!("column `{}` has unknown key `{key}`", name(column)),
                });
            }
        }
    }
    Ok(())
}

// ─── Quoting ─────────────────────────────────────────────────────────────────

/// Backtick-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Single-quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTS: &str = r#"
        [[tables]]
        name = "products"

        [[tables.columns]]
        name = "name"
        type = "string"
        length = 120
        nullable = false

        [[tables.columns]]
        name = "price"
        type = "decimal"
        precision = 10
        scale = 2
        default = 0

        [[tables.columns]]
        name = "status"
        type = "enum"
        values = ["active", "discontinued"]
        default = "active"

        [[tables]]
        name = "audit_log"
        timestamps = false

        [[tables.columns]]
        name = "entry"
        type = "text"
    "#;

    #[test]
    fn parses_toml_schema() {
        let schema = Schema::from_toml_str(PRODUCTS).unwrap();
        assert_eq!(schema.tables.len(), 2);

        let products = &schema.tables[0];
        assert!(products.timestamps);
        assert_eq!(products.columns[0].column_type, ColumnType::String { length: 120 });
        assert!(!products.columns[0].nullable);
        assert_eq!(
            products.columns[1].column_type,
            ColumnType::Decimal { precision: 10, scale: 2 }
        );
        assert_eq!(products.columns[1].default, Some(DefaultValue::Integer(0)));
        assert_eq!(
            products.columns[2].default,
            Some(DefaultValue::Text("active".into()))
        );
        assert!(!schema.tables[1].timestamps);
    }

    #[test]
    fn string_length_defaults_to_255() {
        let schema = Schema::from_toml_str(
            r#"
            [[tables]]
            name = "t"
            [[tables.columns]]
            name = "label"
            type = "string"
            "#,
        )
        .unwrap();
        assert_eq!(
            schema.tables[0].columns[0].column_type,
            ColumnType::String { length: 255 }
        );
    }

    #[test]
    fn adds_implicit_id_and_timestamps() {
        let table = TableDef::new("products").column(ColumnDef::new("name", ColumnType::Text));
        let names: Vec<String> = table.effective_columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["id", "name", "createdAt", "updatedAt"]);

        let keyed = TableDef::new("codes")
            .without_timestamps()
            .column(ColumnDef::new("code", ColumnType::String { length: 8 }).primary_key());
        let names: Vec<String> = keyed.effective_columns().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["code"]);
    }

    #[test]
    fn renders_create_table() {
        let table = TableDef::new("products")
            .column(ColumnDef::new("name", ColumnType::String { length: 120 }).not_null().unique())
            .column(
                ColumnDef::new("in_stock", ColumnType::Boolean).default_value(DefaultValue::Bool(true)),
            );
        assert_eq!(
            table.create_sql(),
            "CREATE TABLE IF NOT EXISTS `products` (\
             `id` INTEGER NOT NULL AUTO_INCREMENT, \
             `name` VARCHAR(120) NOT NULL UNIQUE, \
             `in_stock` TINYINT(1) DEFAULT 1, \
             `createdAt` DATETIME NOT NULL, \
             `updatedAt` DATETIME NOT NULL, \
             PRIMARY KEY (`id`)) ENGINE=InnoDB"
        );
    }

    #[test]
    fn quotes_identifiers_and_literals() {
        assert_eq!(quote_ident("odd`name"), "`odd``name`");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(DefaultValue::Text("now()".into()).sql(), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn rejects_invalid_tables() {
        let duplicate = Schema::new().table(
            TableDef::new("t")
                .column(ColumnDef::new("a", ColumnType::Text))
                .column(ColumnDef::new("A", ColumnType::Text)),
        );
        assert!(matches!(duplicate.validate(), Err(SchemaError::Invalid { .. })));

        let bad_decimal = Schema::new().table(TableDef::new("t").column(ColumnDef::new(
            "price",
            ColumnType::Decimal { precision: 2, scale: 4 },
        )));
        assert!(bad_decimal.validate().is_err());

        let loose_auto = Schema::new()
            .table(TableDef::new("t").column(ColumnDef::new("n", ColumnType::Integer).auto_increment()));
        assert!(loose_auto.validate().is_err());

        let twice = Schema::new().table(TableDef::new("t")).table(TableDef::new("T"));
        assert!(twice.validate().is_err());
    }

    #[test]
    fn rejects_misspelled_keys() {
        let column = r#"
            [[tables]]
            name = "products"

            [[tables.columns]]
            name = "sku"
            type = "string"
            nulable = false
        "#;
        match Schema::from_toml_str(column).unwrap_err() {
            SchemaError::Invalid { table, message } => {
                assert_eq!(table, "products");
                assert!(message.contains("`sku`"), "{message}");
                assert!(message.contains("`nulable`"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let table = r#"
            [[tables]]
            name = "products"
            timestamp = false
        "#;
        assert!(matches!(Schema::from_toml_str(table), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Schema::load("/nonexistent/botica/schema.toml").unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }

    #[test]
    fn matches_reported_defaults() {
        assert!(DefaultValue::Integer(0).matches_reported("0.00"));
        assert!(DefaultValue::Bool(false).matches_reported("0"));
        assert!(DefaultValue::Text("CURRENT_TIMESTAMP".into()).matches_reported("current_timestamp()"));
        assert!(!DefaultValue::Text("active".into()).matches_reported("Active"));
    }
}
