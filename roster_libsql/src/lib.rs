#![forbid(unsafe_code)]
//! libsql/SQLite backend for the roster entity stack.
//!
//! A [`LibsqlSessionFactory`] owns the database handle for one configuration profile.
//! It vends [`LibsqlSession`]s (one connection plus the session state machine),
//! [`LibsqlTransactionManager`]s and [`LibsqlRepository`]s. While a transaction
//! managed by [`LibsqlTransactionManager::execute`] is running, its connection is
//! bound to the current tokio task, and every repository used inside the callback
//! runs its statements on it.

mod factory;
mod repository;
mod session;
mod tx;

use std::sync::Arc;
use std::time::Instant;

use libsql::{Connection, Database, Value};
use roster_core::ParamValue;
use tracing::debug;

pub use factory::LibsqlSessionFactory;
pub use repository::LibsqlRepository;
pub use session::LibsqlSession;
pub use tx::LibsqlTransactionManager;

#[inline]
fn obs_record(op: &str, table: &str, start: Instant, rows: usize, success: bool) {
    let elapsed = start.elapsed().as_millis() as u64;
    debug!(
        table = table,
        op = op,
        rows = rows,
        elapsed_ms = elapsed,
        success = success,
        "repo op"
    );
}

/// Transaction connection bound to a task, tagged with the database it was opened on.
#[derive(Clone)]
struct ActiveTx {
    db: Arc<Database>,
    conn: Connection,
}

// One entry per database with a transaction running on the current task, innermost last.
tokio::task_local! {
    static ACTIVE_TX: Vec<ActiveTx>;
}

/// Connection of the transaction running on the current task for `db`, if any.
fn active_connection(db: &Arc<Database>) -> Option<Connection> {
    ACTIVE_TX
        .try_with(|active| {
            active
                .iter()
                .rev()
                .find(|tx| Arc::ptr_eq(&tx.db, db))
                .map(|tx| tx.conn.clone())
        })
        .ok()
        .flatten()
}

/// The current task's bindings with `tx` added on top.
fn bind_transaction(tx: ActiveTx) -> Vec<ActiveTx> {
    let mut active = ACTIVE_TX.try_with(Vec::clone).unwrap_or_default();
    active.push(tx);
    active
}

fn to_libsql_value(p: ParamValue) -> Value {
    match p {
        ParamValue::String(s) => s.into(),
        ParamValue::I32(i) => (i as i64).into(), // libsql uses i64 for integers
        ParamValue::I64(i) => i.into(),
        ParamValue::F64(f) => f.into(),
        ParamValue::Bool(b) => (b as i64).into(), // SQLite bools are 0/1
        ParamValue::Null => Value::Null,
    }
}
