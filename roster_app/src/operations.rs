//! The two units of work behind the `seed` and `lookup` binaries.
//!
//! Each one runs inside a transaction managed by the profile's session factory:
//! commit when the work succeeds, roll back when it fails, and the session is
//! released on both paths.

use roster::backends::LibsqlSessionFactory;
use roster::batch_ext::BatchInsertExt;
use roster::query::Query;
use roster::transactions::{TransactionDefinition, TransactionTemplate};
use roster::{repository, RepoResult, Repository};
use tracing::info;

use crate::{AppError, Member, Settings};

/// The records inserted by [`seed_and_query`]: name, nick name, age.
pub const SEED_MEMBERS: [(&str, &str, i32); 4] = [
    ("을지문덕", "문덕", 47),
    ("감강찬", "감찬", 50),
    ("잔다르크", "다라", 18),
    ("마리 앙투아네트", "마리", 18),
];

/// Name looked up right after seeding.
pub const SEEDED_LOOKUP_NAME: &str = "잔다르크";

/// Name looked up by the lookup-only program.
pub const LOOKUP_NAME: &str = "111";

#[repository(entity = crate::entity::Member, backend = Libsql, finders(find_by_name: String))]
pub mod member_repository {}

pub fn seed_members() -> Vec<Member> {
    SEED_MEMBERS
        .iter()
        .map(|&(name, nick_name, age)| Member::new(name, nick_name, age))
        .collect()
}

/// Open the session factory for `profile` and bring its schema up to date.
pub async fn open_profile(
    settings: &Settings,
    profile: &str,
) -> Result<LibsqlSessionFactory, AppError> {
    let p = settings.profile(profile)?;
    let factory = LibsqlSessionFactory::open_local(profile, &p.database).await?;
    factory.apply_schema::<Member>(p.schema_action()?).await?;
    Ok(factory)
}

/// Insert `members` as one all-or-nothing batch, returning them with their ids.
pub async fn seed(factory: &LibsqlSessionFactory, members: &[Member]) -> RepoResult<Vec<Member>> {
    let repo = member_repository::Repository::from_factory(factory);
    let repo = &repo;
    let tpl = TransactionTemplate::new(factory.transaction_manager());
    let saved = tpl
        .execute(|_ctx| async move { repo.insert_many(members).await })
        .await?;
    info!(count = saved.len(), "members saved");
    Ok(saved)
}

/// At most one member named `name`, read in a read-only transaction.
pub async fn find_member(factory: &LibsqlSessionFactory, name: &str) -> RepoResult<Option<Member>> {
    let repo = member_repository::Repository::from_factory(factory);
    let repo = &repo;
    let tpl = TransactionTemplate::new(factory.transaction_manager())
        .with_defaults(TransactionDefinition::read_only());
    tpl.execute(|_ctx| async move {
        repo.fetch_one(Query::from(Member::COLUMNS.name.eq(name)))
            .await
    })
    .await
}

/// Seed the four fixed members, then look one of them up by name.
pub async fn seed_and_query(factory: &LibsqlSessionFactory) -> RepoResult<Option<Member>> {
    seed(factory, &seed_members()).await?;
    find_member(factory, SEEDED_LOOKUP_NAME).await
}

/// Look up the fixed name without writing anything.
pub async fn lookup(factory: &LibsqlSessionFactory) -> RepoResult<Option<Member>> {
    find_member(factory, LOOKUP_NAME).await
}

/// What the programs print: the member's string form, or `null` when nothing matched.
pub fn render(found: Option<&Member>) -> String {
    found.map_or_else(|| "null".to_string(), Member::to_string)
}
