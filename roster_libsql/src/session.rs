use libsql::Connection;
use roster_core::transactions::{Isolation, SessionEvent, SessionState, TransactionDefinition};
use roster_core::{RepoError, RepoResult};
use tracing::{debug, warn};

/// Busy timeout applied when a definition does not carry one.
const DEFAULT_BUSY_TIMEOUT_MS: u128 = 1000;

fn begin_sql(isolation: Isolation) -> &'static str {
    match isolation {
        Isolation::Default | Isolation::ReadCommitted => "BEGIN DEFERRED",
        Isolation::RepeatableRead => "BEGIN IMMEDIATE",
        Isolation::Serializable => "BEGIN EXCLUSIVE",
    }
}

/// One connection and the state of the unit of work running on it.
///
/// Every operation is checked against [`SessionState::transition`] before any
/// statement is sent, so e.g. committing a session that never began fails with
/// [`RepoError::InvalidTransition`] instead of a driver error.
pub struct LibsqlSession {
    conn: Connection,
    state: SessionState,
    read_only: bool,
}

impl LibsqlSession {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn,
            state: SessionState::Open,
            read_only: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a transaction shaped by `def`.
    pub async fn begin(&mut self, def: &TransactionDefinition) -> RepoResult<()> {
        let next = self.state.transition(SessionEvent::Begin)?;
        let busy_ms = def
            .timeout
            .map(|d| d.as_millis())
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        // PRAGMAs may return a row; execute_batch steps them to completion either way.
        self.conn
            .execute_batch(&format!("PRAGMA busy_timeout = {}", busy_ms))
            .await
            .map_err(RepoError::backend)?;
        if def.read_only {
            self.conn
                .execute_batch("PRAGMA query_only = ON")
                .await
                .map_err(RepoError::backend)?;
            self.read_only = true;
        }
        if let Err(e) = self.conn.execute(begin_sql(def.isolation), ()).await {
            self.reset_query_only().await;
            return Err(RepoError::backend(e));
        }
        debug!(isolation = ?def.isolation, read_only = def.read_only, "transaction begun");
        self.state = next;
        Ok(())
    }

    pub async fn commit(&mut self) -> RepoResult<()> {
        let next = self.state.transition(SessionEvent::Commit)?;
        // A failed COMMIT leaves the transaction active so the caller can still roll back.
        self.conn
            .execute("COMMIT", ())
            .await
            .map_err(RepoError::backend)?;
        self.state = next;
        self.reset_query_only().await;
        debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(&mut self) -> RepoResult<()> {
        let next = self.state.transition(SessionEvent::Rollback)?;
        self.conn
            .execute("ROLLBACK", ())
            .await
            .map_err(RepoError::backend)?;
        self.state = next;
        self.reset_query_only().await;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Release the session. Closing with a transaction still active leaves the
    /// rollback to the engine when the connection is dropped.
    pub fn close(mut self) -> RepoResult<()> {
        let was_active = self.state.is_transaction_active();
        self.state = self.state.transition(SessionEvent::Close)?;
        if was_active {
            warn!("session closed with an active transaction; the engine rolls it back");
        }
        debug!("session closed");
        Ok(())
    }

    async fn reset_query_only(&mut self) {
        if !self.read_only {
            return;
        }
        if let Err(e) = self.conn.execute_batch("PRAGMA query_only = OFF").await {
            warn!(error = %e, "failed to clear query_only");
        }
        self.read_only = false;
    }
}

impl Drop for LibsqlSession {
    fn drop(&mut self) {
        if self.state.is_transaction_active() {
            warn!("session dropped with an active transaction; the engine rolls it back");
        }
    }
}

impl std::fmt::Debug for LibsqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlSession")
            .field("state", &self.state)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LibsqlSessionFactory;

    async fn factory(dir: &tempfile::TempDir) -> LibsqlSessionFactory {
        LibsqlSessionFactory::open_local("test", dir.path().join("session.db"))
            .await
            .unwrap()
    }

    #[test]
    fn begin_sql_by_isolation() {
        assert_eq!(begin_sql(Isolation::Default), "BEGIN DEFERRED");
        assert_eq!(begin_sql(Isolation::ReadCommitted), "BEGIN DEFERRED");
        assert_eq!(begin_sql(Isolation::RepeatableRead), "BEGIN IMMEDIATE");
        assert_eq!(begin_sql(Isolation::Serializable), "BEGIN EXCLUSIVE");
    }

    #[tokio::test]
    async fn begin_commit_close_walks_the_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let f = factory(&dir).await;
        let mut s = f.open_session().unwrap();
        assert_eq!(s.state(), SessionState::Open);
        s.begin(&TransactionDefinition::default()).await.unwrap();
        assert_eq!(s.state(), SessionState::TransactionActive);
        s.commit().await.unwrap();
        assert_eq!(s.state(), SessionState::Committed);
        s.close().unwrap();
    }

    #[tokio::test]
    async fn commit_without_begin_is_rejected_before_touching_the_driver() {
        let dir = tempfile::tempdir().unwrap();
        let f = factory(&dir).await;
        let mut s = f.open_session().unwrap();
        let err = s.commit().await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidTransition {
                from: SessionState::Open,
                event: SessionEvent::Commit
            }
        ));
        assert_eq!(s.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn rollback_then_begin_again_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let f = factory(&dir).await;
        let mut s = f.open_session().unwrap();
        s.begin(&TransactionDefinition::default()).await.unwrap();
        s.rollback().await.unwrap();
        assert_eq!(s.state(), SessionState::RolledBack);
        assert!(s.begin(&TransactionDefinition::default()).await.is_err());
    }

    #[tokio::test]
    async fn read_only_session_refuses_writes_until_it_ends() {
        let dir = tempfile::tempdir().unwrap();
        let f = factory(&dir).await;
        let setup = f.open_session().unwrap();
        setup
            .connection()
            .execute("CREATE TABLE t (x INTEGER)", ())
            .await
            .unwrap();
        setup.close().unwrap();

        let mut s = f.open_session().unwrap();
        s.begin(&TransactionDefinition::read_only()).await.unwrap();
        assert!(s
            .connection()
            .execute("INSERT INTO t (x) VALUES (1)", ())
            .await
            .is_err());
        s.rollback().await.unwrap();
        // query_only is cleared once the transaction ends
        s.connection()
            .execute("INSERT INTO t (x) VALUES (1)", ())
            .await
            .unwrap();
        s.close().unwrap();
    }
}
