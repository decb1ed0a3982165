use std::path::Path;
use std::sync::Arc;

use libsql::{Builder, Database, Row};
use roster_core::{
    Fetchable, Identifiable, Insertable, RepoError, RepoResult, RowAdapter, SchemaAction,
};
use tracing::info;

use crate::{LibsqlRepository, LibsqlSession, LibsqlTransactionManager};

/// Entry point to one configured database.
///
/// Cloning is cheap and shares the underlying database handle.
#[derive(Clone)]
pub struct LibsqlSessionFactory {
    profile: Arc<str>,
    db: Arc<Database>,
}

impl LibsqlSessionFactory {
    /// Open (creating if needed) a local SQLite file for `profile`.
    ///
    /// In-memory locations are rejected with [`RepoError::InMemoryDatabase`].
    pub async fn open_local(profile: impl Into<String>, path: impl AsRef<Path>) -> RepoResult<Self> {
        let profile: String = profile.into();
        let path = path.as_ref();
        if is_in_memory(path) {
            return Err(RepoError::InMemoryDatabase(path.display().to_string()));
        }
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(RepoError::backend)?;
        info!(profile = %profile, path = %path.display(), "session factory opened");
        Ok(Self {
            profile: profile.into(),
            db: Arc::new(db),
        })
    }

    /// Wrap an already-built database handle.
    pub fn from_arc(profile: impl Into<String>, db: Arc<Database>) -> Self {
        let profile: String = profile.into();
        Self {
            profile: profile.into(),
            db,
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub(crate) fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn open_session(&self) -> RepoResult<LibsqlSession> {
        let conn = self.db.connect().map_err(RepoError::backend)?;
        Ok(LibsqlSession::new(conn))
    }

    pub fn transaction_manager(&self) -> LibsqlTransactionManager {
        LibsqlTransactionManager::new(self.clone())
    }

    pub fn repository<T, A>(&self, adapter: A) -> LibsqlRepository<T, A>
    where
        T: Fetchable + Identifiable + Insertable + 'static,
        A: RowAdapter<T, Row = Row> + Send + Sync + 'static,
    {
        LibsqlRepository::new(self.db.clone(), adapter)
    }

    /// Bring the table of `E` in line with `action`.
    pub async fn apply_schema<E>(&self, action: SchemaAction) -> RepoResult<()>
    where
        E: Fetchable,
    {
        let conn = self.db.connect().map_err(RepoError::backend)?;
        if action == SchemaAction::DropCreate {
            conn.execute(&roster_sql_builder::drop_table::<E>(), ())
                .await
                .map_err(RepoError::backend)?;
        }
        if action != SchemaAction::None {
            conn.execute(&roster_sql_builder::create_table::<E>(), ())
                .await
                .map_err(RepoError::backend)?;
        }
        info!(profile = %self.profile, table = E::TABLE, action = %action, "schema applied");
        Ok(())
    }

    /// Release this handle. The database closes once every clone, manager and
    /// repository built from it is gone.
    pub fn close(self) {
        info!(profile = %self.profile, "session factory closed");
    }
}

/// `:memory:`, the empty path and `file:` URIs naming a memory database.
fn is_in_memory(path: &Path) -> bool {
    let location = path.to_string_lossy();
    let location = location.trim();
    location.is_empty()
        || location == ":memory:"
        || location.starts_with("file::memory:")
        || (location.starts_with("file:") && location.contains("mode=memory"))
}

impl std::fmt::Debug for LibsqlSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlSessionFactory")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
