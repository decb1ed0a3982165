#![forbid(unsafe_code)]
//! Facade crate re-exporting the roster entity stack.
//!
//! Add this single crate as a dependency to get the core traits, the derive and
//! repository macros, the typed query DSL and (with `libsql-backend`) the libsql
//! sessions, transaction manager and repository.
//!
//! # Example: Deriving `Entity`
//!
//! ```ignore
//! use roster::{Entity, Fetchable};
//!
//! #[derive(Entity, Clone, Debug)]
//! pub struct Member {
//!     #[fetch(id)]
//!     pub id: Option<i64>,
//!     pub name: String,
//!     pub age: Option<i32>,
//! }
//!
//! assert_eq!(Member::TABLE, "members");
//! assert_eq!(Member::SELECT_COLUMNS, &["id", "name", "age"]);
//!
//! // Typed columns: `Member::COLUMNS.name` only accepts strings.
//! let q = roster::query::Query::from(Member::COLUMNS.name.eq("잔다르크"));
//! ```
//!
//! Naming a column the entity does not have is rejected by the compiler:
//!
//! ```compile_fail
//! use roster::Entity;
//!
//! #[derive(Entity)]
//! struct Member {
//!     #[fetch(id)]
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! let _ = Member::COLUMNS.nmae.eq("잔다르크");
//! ```
//!
//! So is comparing a column with a value of the wrong type:
//!
//! ```compile_fail
//! use roster::Entity;
//!
//! #[derive(Entity)]
//! struct Member {
//!     #[fetch(id)]
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! let _ = Member::COLUMNS.name.eq(18);
//! ```

#![allow(unexpected_cfgs)]

// Re-export all core traits.
pub use roster_core::{
    ColumnDef, Fetchable, Identifiable, Insertable, ParamValue, RepoError, RepoResult, Repository,
    RowAdapter, SchemaAction, SqlType,
};

// Re-export all procedural macros.
pub use roster_macros::{repository, Entity};

// Optional re-export of the SQL builder helpers.
#[cfg(feature = "sql-builder")]
pub use roster_sql_builder as sql_builder;

// Backend-agnostic transactions API and the typed query DSL.
pub use roster_core::{query, transactions};

// Optional batch insert extension.
#[cfg(feature = "batch-ext")]
pub mod batch_ext {
    use crate::RepoResult;

    #[async_trait::async_trait]
    pub trait BatchInsertExt<T>: roster_core::Repository<T>
    where
        T: roster_core::Identifiable + Send + Sync + Clone + 'static,
    {
        /// Insert `entities` in order and return them as persisted, keys included.
        /// Stops at the first failure; run it inside a transaction to make the
        /// batch all-or-nothing.
        async fn insert_many(&self, entities: &[T]) -> RepoResult<Vec<T>> {
            let mut out = Vec::with_capacity(entities.len());
            for e in entities {
                out.push(self.insert(e).await?);
            }
            Ok(out)
        }
    }

    #[async_trait::async_trait]
    impl<T, R> BatchInsertExt<T> for R
    where
        T: roster_core::Identifiable + Send + Sync + Clone + 'static,
        R: roster_core::Repository<T> + Send + Sync,
    {
    }
}

/// Backend types, referenced by code generated with `#[repository]`.
pub mod backends {
    #[cfg(feature = "libsql-backend")]
    pub use roster_libsql::{
        LibsqlRepository, LibsqlSession, LibsqlSessionFactory, LibsqlTransactionManager,
    };
}
