//! Schema reconciliation ("alter" sync).
//!
//! For each declared table the live columns are read from
//! `information_schema` and diffed against the declaration:
//! - table missing → `CREATE TABLE`
//! - column missing → `ADD COLUMN`
//! - type / nullability / default / auto-increment differ → `MODIFY COLUMN`
//! - column not declared → `DROP COLUMN` (unless [`SyncOptions::drop_columns`] is off)
//!
//! A live table that already matches produces no statements at all.

use std::collections::HashMap;

use crate::client::LiveColumn;
use crate::schema::{quote_ident, quote_literal, ColumnDef, TableDef};

/// Knobs for the reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Drop live columns that are no longer declared.
    pub drop_columns: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { drop_columns: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterationKind {
    CreateTable,
    AddColumn(String),
    ModifyColumn(String),
    DropColumn(String),
}

/// One DDL statement of a sync plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alteration {
    pub table: String,
    pub kind: AlterationKind,
    pub sql: String,
}

/// What a sync run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub tables_checked: usize,
    pub applied: Vec<Alteration>,
}

impl SyncReport {
    /// True when the live schema already matched.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn count(&self, matches: impl Fn(&AlterationKind) -> bool) -> usize {
        self.applied.iter().filter(|a| matches(&a.kind)).count()
    }
}

/// Introspection query for one table of the current database.
///
/// Every column is cast to `CHAR`; MySQL 8 reports some `information_schema`
/// columns as binary strings otherwise.
pub fn describe_table_sql(table: &str) -> String {
    format!(
        "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, \
         CAST(COLUMN_TYPE AS CHAR) AS column_type, \
         CAST(IS_NULLABLE AS CHAR) AS is_nullable, \
         CAST(COLUMN_DEFAULT AS CHAR) AS column_default, \
         CAST(COLUMN_KEY AS CHAR) AS column_key, \
         CAST(EXTRA AS CHAR) AS extra \
         FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {} \
         ORDER BY ORDINAL_POSITION",
        quote_literal(table)
    )
}

/// Plan the statements that bring `live` in line with `table`.
pub fn plan_table(table: &TableDef, live: &[LiveColumn], options: SyncOptions) -> Vec<Alteration> {
    let alteration = |kind, sql| Alteration {
        table: table.name.clone(),
        kind,
        sql,
    };

    if live.is_empty() {
        return vec![alteration(AlterationKind::CreateTable, table.create_sql())];
    }

    let declared = table.effective_columns();
    let by_name: HashMap<String, &LiveColumn> = live
        .iter()
        .map(|c| (c.name.to_ascii_lowercase(), c))
        .collect();
    let quoted_table = quote_ident(&table.name);

    let mut added = Vec::new();
    let mut modified = Vec::new();
    for column in &declared {
        match by_name.get(&column.name.to_ascii_lowercase()) {
            None => added.push(alteration(
                AlterationKind::AddColumn(column.name.clone()),
                format!(
                    "ALTER TABLE {quoted_table} ADD COLUMN {} {}",
                    quote_ident(&column.name),
                    add_definition(column)
                ),
            )),
            Some(existing) if !column_matches(column, existing) => modified.push(alteration(
                AlterationKind::ModifyColumn(column.name.clone()),
                format!(
                    "ALTER TABLE {quoted_table} MODIFY COLUMN {} {}",
                    quote_ident(&column.name),
                    column.definition(false)
                ),
            )),
            Some(_) => {}
        }
    }

    let mut dropped = Vec::new();
    if options.drop_columns {
        for existing in live {
            let still_declared = declared
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&existing.name));
            if !still_declared {
                dropped.push(alteration(
                    AlterationKind::DropColumn(existing.name.clone()),
                    format!(
                        "ALTER TABLE {quoted_table} DROP COLUMN {}",
                        quote_ident(&existing.name)
                    ),
                ));
            }
        }
    }

    added.into_iter().chain(modified).chain(dropped).collect()
}

/// `ADD COLUMN` may introduce a key, `MODIFY COLUMN` never re-declares one.
fn add_definition(column: &ColumnDef) -> String {
    if column.primary_key {
        format!("{} PRIMARY KEY", column.definition(true))
    } else {
        column.definition(true)
    }
}

/// Whether the live column already has the declared shape.
pub fn column_matches(declared: &ColumnDef, live: &LiveColumn) -> bool {
    normalize_type(&live.column_type) == declared.column_type.normalized()
        && live.nullable == declared.is_nullable()
        && live.is_auto_increment() == declared.auto_increment
        && defaults_match(declared, live.default.as_deref())
}

fn defaults_match(declared: &ColumnDef, reported: Option<&str>) -> bool {
    let reported = reported
        .map(unquote)
        .filter(|v| !v.eq_ignore_ascii_case("NULL"));
    match (&declared.default, reported) {
        (None, None) => true,
        (Some(value), Some(reported)) => value.matches_reported(reported),
        _ => false,
    }
}

/// MariaDB reports string defaults quoted, MySQL does not.
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Lower-case a reported type and drop integer display widths (`int(11)` → `int`).
/// `tinyint(1)` keeps its width since it is how booleans are reported.
pub fn normalize_type(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    for base in ["bigint", "mediumint", "smallint", "int"] {
        if let Some(after) = lowered
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('('))
        {
            if let Some(end) = after.find(')') {
                return format!("{base}{}", &after[end + 1..]);
            }
        }
    }
    lowered
}
