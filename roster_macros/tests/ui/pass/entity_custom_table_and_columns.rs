use roster_core::{Fetchable, Identifiable, Insertable};
use roster_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
#[entity(table = "people")]
struct Person {
    #[fetch(id, column = "person_id")]
    id: i64,
    #[fetch(column = "display_name")]
    name: String,
    #[fetch(skip)]
    cached_label: String,
    score: f64,
    active: bool,
}

fn main() {
    assert_eq!(Person::TABLE, "people");
    assert_eq!(Person::ID_COLUMN, "person_id");
    assert_eq!(
        Person::SELECT_COLUMNS,
        &["person_id", "display_name", "score", "active"]
    );
    assert_eq!(Person::INSERT_COLUMNS, &["display_name", "score", "active"]);
    let p = Person {
        id: 3,
        name: "n".into(),
        cached_label: String::new(),
        score: 1.5,
        active: true,
    };
    assert_eq!(p.id(), Some(3));
    assert_eq!(p.insert_values().len(), 3);
}
