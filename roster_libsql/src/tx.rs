use roster_core::transactions::{TransactionContext, TransactionDefinition, TransactionManager};
use roster_core::RepoResult;
use tracing::{debug, warn};

use crate::{bind_transaction, ActiveTx, LibsqlSession, LibsqlSessionFactory, ACTIVE_TX};

/// A concrete TransactionManager for libsql/SQLite.
///
/// Each outermost `execute` opens its own session. A nested `execute` on the same
/// task joins the running transaction only when both were opened on the same
/// database; a manager for another database starts its own, and repositories of
/// the outer database keep using the outer transaction inside it.
#[derive(Clone, Debug)]
pub struct LibsqlTransactionManager {
    factory: LibsqlSessionFactory,
}

impl LibsqlTransactionManager {
    pub fn new(factory: LibsqlSessionFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &LibsqlSessionFactory {
        &self.factory
    }
}

async fn finish<R>(session: &mut LibsqlSession, result: RepoResult<R>) -> RepoResult<R> {
    match result {
        Ok(value) => match session.commit().await {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                warn!(error = %commit_err, "commit failed; rolling back");
                if let Err(rb) = session.rollback().await {
                    warn!(error = %rb, "rollback after failed commit also failed");
                }
                Err(commit_err)
            }
        },
        Err(e) => {
            warn!(error = %e, "unit of work failed; rolling back");
            if let Err(rb) = session.rollback().await {
                warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}

#[async_trait::async_trait]
impl TransactionManager for LibsqlTransactionManager {
    async fn execute<'a, R, F, Fut>(&'a self, def: &TransactionDefinition, f: F) -> RepoResult<R>
    where
        F: FnOnce(TransactionContext<'a>) -> Fut + Send + 'a,
        Fut: core::future::Future<Output = RepoResult<R>> + Send + 'a,
        R: Send + 'a,
    {
        let db = self.factory.database();
        if crate::active_connection(db).is_some() {
            debug!(profile = self.factory.profile(), "joining active transaction");
            return f(TransactionContext::new()).await;
        }

        let mut session = self.factory.open_session()?;
        if let Err(e) = session.begin(def).await {
            session.close()?;
            return Err(e);
        }

        let active = ActiveTx {
            db: db.clone(),
            conn: session.connection().clone(),
        };
        let result = ACTIVE_TX
            .scope(bind_transaction(active), f(TransactionContext::new()))
            .await;

        let outcome = finish(&mut session, result).await;
        if let Err(e) = session.close() {
            warn!(error = %e, "failed to close session");
        }
        outcome
    }
}
