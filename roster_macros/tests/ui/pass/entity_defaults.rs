use roster_core::{Fetchable, Identifiable, Insertable, ParamValue, SqlType};
use roster_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Article {
    #[fetch(id)]
    id: Option<i64>,
    title: String,
    subtitle: Option<String>,
}

fn main() {
    // Table name is the pluralized snake case of the struct name.
    assert_eq!(Article::TABLE, "articles");
    assert_eq!(Article::SELECT_COLUMNS, &["id", "title", "subtitle"]);
    assert_eq!(Article::INSERT_COLUMNS, &["title", "subtitle"]);

    let defs = Article::COLUMN_DEFS;
    assert_eq!(defs.len(), 3);
    assert!(defs[0].primary_key);
    assert_eq!(defs[0].sql_type, SqlType::Integer);
    assert!(!defs[1].nullable);
    assert_eq!(defs[1].sql_type, SqlType::Text);
    assert!(defs[2].nullable);

    let a = Article {
        id: Some(5),
        title: "t".into(),
        subtitle: None,
    };
    let id: Option<<Article as Identifiable>::Key> = a.id();
    assert_eq!(id, Some(5));
    assert_eq!(
        a.insert_values(),
        vec![ParamValue::String("t".into()), ParamValue::Null]
    );
    let _adapter = ArticleRowAdapter;
}
