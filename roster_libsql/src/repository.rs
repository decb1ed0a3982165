use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use libsql::{Connection, Database, Row, Value};
use roster_core::query::Query;
use roster_core::{
    Fetchable, Identifiable, Insertable, ParamValue, RepoError, RepoResult, Repository, RowAdapter,
};

use crate::{obs_record, to_libsql_value};

/// Statements built once per repository from the entity metadata.
struct RepoSql<T> {
    select_by_id: String,
    insert: String,
    count: String,
    find_by_field_cache: Mutex<HashMap<String, String>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RepoSql<T>
where
    T: Fetchable + Identifiable + Insertable,
{
    fn new() -> Self {
        Self {
            select_by_id: roster_sql_builder::select_by_id::<T>(T::ID_COLUMN),
            insert: roster_sql_builder::insert::<T>(),
            count: roster_sql_builder::select_count_all::<T>(),
            find_by_field_cache: Mutex::new(HashMap::new()),
            _marker: PhantomData,
        }
    }

    fn get_select_by_field(&self, field: &str) -> String {
        // A poisoned cache only ever holds complete entries.
        let mut guard = self
            .find_by_field_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(s) = guard.get(field) {
            return s.clone();
        }
        let built = roster_sql_builder::select_by_field::<T>(field);
        guard.insert(field.to_string(), built.clone());
        built
    }
}

fn check_column<T: Fetchable>(column: &str) -> RepoResult<()> {
    if T::SELECT_COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(RepoError::UnknownColumn {
            table: T::TABLE,
            column: column.to_string(),
        })
    }
}

fn not_found_after_insert() -> RepoError {
    RepoError::backend(std::io::Error::new(
        std::io::ErrorKind::Other,
        "failed to fetch entity after insert",
    ))
}

/// A fully asynchronous, `libsql`-backed repository.
pub struct LibsqlRepository<T, A>
where
    T: Identifiable + 'static,
    A: RowAdapter<T> + Send + Sync + 'static,
{
    db: Arc<Database>,
    /// Optional connection bound at construction. When set, operations outside a
    /// managed transaction run on it instead of opening a new one.
    conn: Option<Connection>,
    adapter: A,
    sql: RepoSql<T>,
}

impl<T, A> LibsqlRepository<T, A>
where
    T: Fetchable + Identifiable + Insertable + 'static,
    A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
{
    pub fn new(db: Arc<Database>, adapter: A) -> Self {
        Self {
            db,
            conn: None,
            adapter,
            sql: RepoSql::new(),
        }
    }

    /// Creates a repository whose operations execute on the provided connection.
    pub fn from_conn(db: Arc<Database>, conn: Connection, adapter: A) -> Self {
        Self {
            db,
            conn: Some(conn),
            adapter,
            sql: RepoSql::new(),
        }
    }

    /// The running transaction's connection when it is on this repository's
    /// database, then the bound one, then a fresh one.
    fn connection(&self) -> RepoResult<Connection> {
        if let Some(tx_conn) = crate::active_connection(&self.db) {
            return Ok(tx_conn);
        }
        if let Some(c) = &self.conn {
            return Ok(c.clone());
        }
        self.db.connect().map_err(RepoError::backend)
    }

    async fn query_all(&self, sql: &str, params: Vec<Value>) -> RepoResult<Vec<T>> {
        let conn = self.connection()?;
        let mut rows = conn.query(sql, params).await.map_err(RepoError::backend)?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next().await.map_err(RepoError::backend)? {
            entities.push(self.adapter.from_row(&row)?);
        }
        Ok(entities)
    }
}

#[async_trait]
impl<T, A> Repository<T> for LibsqlRepository<T, A>
where
    T: Fetchable + Identifiable + Insertable + Send + Sync + Clone + 'static,
    A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
    T::Key: Clone
        + Send
        + Sync
        + 'static
        + Into<Value>
        + serde::Serialize
        + serde::de::DeserializeOwned,
{
    async fn find_by_id(&self, id: &T::Key) -> RepoResult<Option<T>> {
        let start = Instant::now();
        let found = self
            .query_all(&self.sql.select_by_id, vec![id.clone().into()])
            .await;
        match found {
            Ok(rows) => {
                obs_record("find_by_id", T::TABLE, start, rows.len(), true);
                Ok(rows.into_iter().next())
            }
            Err(e) => {
                obs_record("find_by_id", T::TABLE, start, 0, false);
                Err(e)
            }
        }
    }

    async fn find_by_field(&self, field_name: &str, value: ParamValue) -> RepoResult<Vec<T>> {
        check_column::<T>(field_name)?;
        let start = Instant::now();
        let sql = self.sql.get_select_by_field(field_name);
        let found = self.query_all(&sql, vec![to_libsql_value(value)]).await;
        obs_record(
            "find_by_field",
            T::TABLE,
            start,
            found.as_ref().map_or(0, Vec::len),
            found.is_ok(),
        );
        found
    }

    async fn fetch(&self, query: &Query<T>) -> RepoResult<Vec<T>> {
        for p in query.predicates() {
            check_column::<T>(p.column())?;
        }
        let start = Instant::now();
        let (sql, params) = roster_sql_builder::select_query(query);
        let params = params.into_iter().map(to_libsql_value).collect();
        let found = self.query_all(&sql, params).await;
        obs_record(
            "fetch",
            T::TABLE,
            start,
            found.as_ref().map_or(0, Vec::len),
            found.is_ok(),
        );
        found
    }

    async fn fetch_one(&self, query: Query<T>) -> RepoResult<Option<T>> {
        let rows = self.fetch(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, entity: &T) -> RepoResult<T> {
        let start = Instant::now();
        let values: Vec<Value> = entity
            .insert_values()
            .into_iter()
            .map(to_libsql_value)
            .collect();
        // Same connection for the write and the read-back, so the new row is visible.
        let conn = self.connection()?;
        let inserted: RepoResult<T> = async {
            conn.execute(&self.sql.insert, values)
                .await
                .map_err(RepoError::backend)?;
            let new_id = conn.last_insert_rowid();
            let new_key: T::Key = serde_json::from_value(serde_json::Value::from(new_id))
                .map_err(RepoError::mapping)?;
            let key: Value = new_key.into();
            let mut rows = conn
                .query(&self.sql.select_by_id, vec![key])
                .await
                .map_err(RepoError::backend)?;
            match rows.next().await.map_err(RepoError::backend)? {
                Some(row) => self.adapter.from_row(&row),
                None => Err(not_found_after_insert()),
            }
        }
        .await;
        obs_record(
            "insert",
            T::TABLE,
            start,
            usize::from(inserted.is_ok()),
            inserted.is_ok(),
        );
        inserted
    }

    async fn count(&self) -> RepoResult<u64> {
        let start = Instant::now();
        let conn = self.connection()?;
        let counted: RepoResult<u64> = async {
            let mut rows = conn
                .query(&self.sql.count, ())
                .await
                .map_err(RepoError::backend)?;
            let row = rows
                .next()
                .await
                .map_err(RepoError::backend)?
                .ok_or_else(|| {
                    RepoError::backend(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "COUNT(*) returned no row",
                    ))
                })?;
            let n: i64 = row.get(0).map_err(RepoError::mapping)?;
            u64::try_from(n).map_err(RepoError::mapping)
        }
        .await;
        obs_record("count", T::TABLE, start, 1, counted.is_ok());
        counted
    }
}
