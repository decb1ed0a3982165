#![forbid(unsafe_code)]
#![allow(unexpected_cfgs)]
//! SQL text generation from the metadata emitted by `#[derive(Entity)]`.
//!
//! Every statement uses positional `?` placeholders, which is what libsql binds.
//! Identifiers are taken from `Fetchable`/`Insertable` constants, which the derive
//! validates at compile time; values never appear in the SQL text.

use roster_core::query::Query;
use roster_core::{ColumnDef, Fetchable, Insertable, ParamValue};

const PLACEHOLDER: &str = "?";

fn placeholders(n: usize) -> String {
    vec![PLACEHOLDER; n].join(", ")
}

/// Build a simple SELECT ... WHERE id = ? statement using metadata from `E`.
pub fn select_by_id<E>(id_column: &str) -> String
where
    E: Fetchable,
{
    let cols = E::SELECT_COLUMNS.join(", ");
    format!(
        "SELECT {cols} FROM {table} WHERE {id} = {ph}",
        cols = cols,
        table = E::TABLE,
        id = id_column,
        ph = PLACEHOLDER
    )
}

/// Build SELECT <cols> FROM <table>
pub fn select_all<E>() -> String
where
    E: Fetchable,
{
    let cols = E::SELECT_COLUMNS.join(", ");
    format!("SELECT {cols} FROM {table}", cols = cols, table = E::TABLE)
}

/// Build SELECT ... WHERE <field> = ?
pub fn select_by_field<E>(field: &str) -> String
where
    E: Fetchable,
{
    format!(
        "{select} WHERE {field} = {ph}",
        select = select_all::<E>(),
        field = field,
        ph = PLACEHOLDER
    )
}

/// Render a typed query into SQL text and its bind parameters, in placeholder order.
pub fn select_query<E>(query: &Query<E>) -> (String, Vec<ParamValue>)
where
    E: Fetchable,
{
    let mut sql = select_all::<E>();
    let mut params = Vec::with_capacity(query.predicates().len());
    let clauses: Vec<String> = query
        .predicates()
        .iter()
        .map(|p| {
            params.push(p.value().clone());
            format!("{} {} {}", p.column(), p.op().as_sql(), PLACEHOLDER)
        })
        .collect();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    if let Some(limit) = query.limit_value() {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    (sql, params)
}

/// Build `WHERE a = ? AND b = ?` from field/value pairs. Empty input yields an empty clause.
pub fn build_where_and(params: &[(&str, ParamValue)]) -> (String, Vec<ParamValue>) {
    if params.is_empty() {
        return (String::new(), Vec::new());
    }
    let clauses: Vec<String> = params
        .iter()
        .map(|(field, _)| format!("{} = {}", field, PLACEHOLDER))
        .collect();
    let out_params = params.iter().map(|(_, v)| v.clone()).collect();
    (format!("WHERE {}", clauses.join(" AND ")), out_params)
}

/// Build INSERT INTO <table> (<cols>) VALUES (?, ...). The key column is left to storage.
pub fn insert<E>() -> String
where
    E: Fetchable + Insertable,
{
    let cols = E::INSERT_COLUMNS;
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = E::TABLE,
        cols = cols.join(", "),
        vals = placeholders(cols.len())
    )
}

/// Multi-row INSERT with one `(?, ...)` tuple per row.
///
/// # Panics
/// Panics if `rows` is zero.
pub fn insert_many<E>(rows: usize) -> String
where
    E: Fetchable + Insertable,
{
    assert!(rows >= 1, "rows must be >= 1");
    let cols = E::INSERT_COLUMNS;
    let tuple = format!("({})", placeholders(cols.len()));
    let values = vec![tuple; rows].join(", ");
    format!(
        "INSERT INTO {table} ({cols}) VALUES {values}",
        table = E::TABLE,
        cols = cols.join(", "),
        values = values
    )
}

pub fn select_count_all<E>() -> String
where
    E: Fetchable,
{
    format!("SELECT COUNT(*) FROM {table}", table = E::TABLE)
}

fn column_ddl(def: &ColumnDef) -> String {
    let mut out = format!("{} {}", def.name, def.sql_type.as_sql());
    if def.primary_key {
        out.push_str(" PRIMARY KEY");
        if def.sql_type == roster_core::SqlType::Integer {
            out.push_str(" AUTOINCREMENT");
        }
    } else if !def.nullable {
        out.push_str(" NOT NULL");
    }
    out
}

/// `CREATE TABLE IF NOT EXISTS` from the entity's column definitions.
pub fn create_table<E>() -> String
where
    E: Fetchable,
{
    let cols: Vec<String> = E::COLUMN_DEFS.iter().map(column_ddl).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({cols})",
        table = E::TABLE,
        cols = cols.join(", ")
    )
}

pub fn drop_table<E>() -> String
where
    E: Fetchable,
{
    format!("DROP TABLE IF EXISTS {table}", table = E::TABLE)
}
