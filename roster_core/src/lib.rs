#![forbid(unsafe_code)]
//! Core traits for the roster entity stack.
//! This crate is database-agnostic and should not contain any backend-specific logic.

// Re-export for downstream macro expansions (used by roster_macros::repository)
pub use async_trait::async_trait;

pub mod query;
pub mod transactions;

use std::fmt;
use std::str::FromStr;

use query::Query;

/// Storage class of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

/// One entry of the field-to-column mapping generated by `#[derive(Entity)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Marker trait for types that can be fetched from a database.
/// Implemented via `#[derive(Entity)]` proc-macro in `roster_macros`.
///
/// Provides compile-time metadata used by the SQL builder and repositories.
pub trait Fetchable {
    const TABLE: &'static str;
    const SELECT_COLUMNS: &'static [&'static str];

    /// Column definitions in `SELECT_COLUMNS` order, used for schema generation.
    const COLUMN_DEFS: &'static [ColumnDef];
}

/// A backend-agnostic representation of a database parameter value.
/// This is used to pass entity field values from generated code to backend adapters
/// without making `roster_core` dependent on a specific database driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::I32(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::I64(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::F64(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Trait for entities that have an identifiable key.
/// This trait exposes the key type and column name so macros can introspect it.
pub trait Identifiable {
    /// The type of the primary key (e.g., `i64`).
    type Key;

    /// The name of the primary key column in the database.
    const ID_COLUMN: &'static str;

    /// Returns a copy of the entity's ID, if storage has assigned one.
    fn id(&self) -> Option<Self::Key>;
}

/// Trait for types whose fields can be extracted for an INSERT statement.
/// This is implemented by the `#[derive(Entity)]` macro.
pub trait Insertable {
    /// The columns to be used in an INSERT statement, excluding auto-generated keys.
    const INSERT_COLUMNS: &'static [&'static str];

    /// The values of the fields corresponding to `INSERT_COLUMNS`.
    fn insert_values(&self) -> Vec<ParamValue>;
}

/// What to do with an entity's table when a session factory opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaAction {
    /// Leave the schema alone.
    None,
    /// `CREATE TABLE IF NOT EXISTS`.
    #[default]
    Create,
    /// Drop the table, then create it.
    DropCreate,
}

impl FromStr for SchemaAction {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SchemaAction::None),
            "create" => Ok(SchemaAction::Create),
            "drop-create" | "drop_create" => Ok(SchemaAction::DropCreate),
            other => Err(RepoError::InvalidSchemaAction(other.to_string())),
        }
    }
}

impl fmt::Display for SchemaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchemaAction::None => "none",
            SchemaAction::Create => "create",
            SchemaAction::DropCreate => "drop-create",
        };
        f.write_str(s)
    }
}

/// Lightweight, backend-agnostic error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Error while mapping a backend row into an entity.
    #[error("mapping error")]
    Mapping {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Opaque backend error from the underlying driver or adapter.
    #[error("backend error")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A string-keyed finder named a column the entity does not map.
    #[error("unknown column `{column}` on table `{table}`")]
    UnknownColumn { table: &'static str, column: String },
    /// A session was driven along an edge its state machine does not have.
    #[error("invalid session transition: {event:?} while {from:?}")]
    InvalidTransition {
        from: transactions::SessionState,
        event: transactions::SessionEvent,
    },
    #[error("unknown schema action `{0}` (expected none, create or drop-create)")]
    InvalidSchemaAction(String),
    /// Every session opens its own connection, so a private in-memory database
    /// would be empty again for each of them.
    #[error("in-memory database `{0}` is not supported; configure a file path")]
    InMemoryDatabase(String),
}

impl RepoError {
    /// Wrap a backend/driver error.
    pub fn backend<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Backend {
            source: Box::new(e),
        }
    }
    /// Wrap a row-mapping error.
    pub fn mapping<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RepoError::Mapping {
            source: Box::new(e),
        }
    }
}

/// Convenience alias for results returned by repository methods.
pub type RepoResult<T> = Result<T, RepoError>;

/// A minimal, asynchronous repository interface for an entity `T`.
/// This is intentionally DB-agnostic. Concrete backends provide implementations.
#[async_trait]
pub trait Repository<T: Identifiable> {
    /// Fetch an entity by its primary key. Returns Ok(None) if not found.
    async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>>;

    /// A generic finder for a single field. Returns a (possibly empty) Vec of entities.
    /// Field names outside `Fetchable::SELECT_COLUMNS` are rejected with
    /// [`RepoError::UnknownColumn`] before any statement is sent.
    async fn find_by_field(&self, field_name: &str, value: ParamValue) -> RepoResult<Vec<T>>;

    /// Run a typed query and return every matching row.
    async fn fetch(&self, query: &Query<T>) -> RepoResult<Vec<T>>;

    /// Run a typed query limited to one row. When several rows match, which one is
    /// returned is up to the storage engine.
    async fn fetch_one(&self, query: Query<T>) -> RepoResult<Option<T>>;

    /// Insert a new entity. Storage assigns the key; the returned entity carries it.
    async fn insert(&self, entity: &T) -> RepoResult<T>;

    /// Number of rows in the entity's table.
    async fn count(&self) -> RepoResult<u64>;
}

/// A tiny adapter for mapping a backend-specific row type into an entity `T`.
#[allow(clippy::wrong_self_convention)]
pub trait RowAdapter<T> {
    type Row;
    fn from_row(&self, row: &Self::Row) -> RepoResult<T>;
}
