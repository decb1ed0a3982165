#![allow(unexpected_cfgs)]

use roster_core::query::Query;
use roster_core::transactions::{TransactionDefinition, TransactionManager, TransactionTemplate};
use roster_core::{RepoError, RepoResult, Repository, SchemaAction};
use roster_libsql::{LibsqlRepository, LibsqlSessionFactory};

#[derive(roster_macros::Entity, Clone, Debug, PartialEq)]
#[entity(table = "books")]
struct Book {
    #[fetch(id)]
    id: Option<i64>,
    title: String,
    pages: Option<i32>,
    rating: f64,
}

fn book(title: &str, pages: Option<i32>) -> Book {
    Book {
        id: None,
        title: title.into(),
        pages,
        rating: 4.5,
    }
}

async fn factory(dir: &tempfile::TempDir) -> RepoResult<LibsqlSessionFactory> {
    let f = LibsqlSessionFactory::open_local("main", dir.path().join("books.db")).await?;
    f.apply_schema::<Book>(SchemaAction::DropCreate).await?;
    Ok(f)
}

#[tokio::test]
async fn libsql_insert_and_lookup_in_a_managed_transaction() -> RepoResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let f = factory(&dir).await?;
    let repo: LibsqlRepository<Book, BookRowAdapter> = f.repository(BookRowAdapter);
    let repo_ref = &repo;
    let tpl = TransactionTemplate::new(f.transaction_manager());

    let ids = tpl
        .execute(|_ctx| async move {
            let a = repo_ref.insert(&book("Dune", Some(412))).await?;
            let b = repo_ref.insert(&book("Untitled", None)).await?;
            Ok::<_, RepoError>((a.id, b.id))
        })
        .await?;
    assert!(ids.0.is_some() && ids.1.is_some());
    assert_ne!(ids.0, ids.1);

    let found = repo
        .fetch_one(Query::from(Book::COLUMNS.title.eq("Dune")))
        .await?
        .expect("book present after commit");
    assert_eq!(found.pages, Some(412));
    assert_eq!(found.rating, 4.5);

    let untitled = repo
        .fetch_one(Query::from(Book::COLUMNS.title.eq("Untitled")))
        .await?
        .expect("second book present");
    assert_eq!(untitled.pages, None);
    assert_eq!(repo.count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn failure_after_first_insert_leaves_nothing_behind() -> RepoResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let f = factory(&dir).await?;
    let repo: LibsqlRepository<Book, BookRowAdapter> = f.repository(BookRowAdapter);
    let repo_ref = &repo;
    let mgr = f.transaction_manager();

    let res = mgr
        .execute(&TransactionDefinition::default(), |_ctx| async move {
            repo_ref.insert(&book("first", Some(1))).await?;
            // An unknown column aborts the unit of work
            repo_ref
                .find_by_field("no_such_column", "x".into())
                .await
                .map(|_| ())
        })
        .await;
    assert!(matches!(res, Err(RepoError::UnknownColumn { .. })));
    assert_eq!(repo.count().await?, 0);
    assert!(repo
        .fetch_one(Query::from(Book::COLUMNS.title.eq("first")))
        .await?
        .is_none());
    Ok(())
}

#[tokio::test]
async fn repositories_from_separate_factories_share_the_file() -> RepoResult<()> {
    let dir = tempfile::tempdir().unwrap();
    let writer = factory(&dir).await?;
    writer
        .repository::<Book, _>(BookRowAdapter)
        .insert(&book("shared", None))
        .await?;
    writer.close();

    let reader = LibsqlSessionFactory::open_local("main", dir.path().join("books.db")).await?;
    reader.apply_schema::<Book>(SchemaAction::Create).await?;
    let repo = reader.repository::<Book, _>(BookRowAdapter);
    let rows = repo.find_by_field("title", "shared".into()).await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}
