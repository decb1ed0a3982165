use roster_core::query::Query;
use roster_core::ParamValue;
use roster_macros::Entity;

#[derive(Entity, Clone, Debug, PartialEq)]
struct Member {
    #[fetch(id)]
    id: Option<i64>,
    name: String,
    nick_name: Option<String>,
    age: Option<i32>,
}

fn main() {
    let cols = Member::COLUMNS;
    assert_eq!(cols.id.name(), "id");
    assert_eq!(cols.nick_name.name(), "nick_name");

    let q = Query::from(cols.name.eq("잔다르크")).and(cols.age.eq(Some(18i32)));
    assert_eq!(q.predicates().len(), 2);
    assert_eq!(q.predicates()[0].value(), &ParamValue::String("잔다르크".into()));
    assert_eq!(q.predicates()[1].value(), &ParamValue::I32(18));

    let by_id = Query::from(cols.id.eq(7i64));
    assert_eq!(by_id.predicates()[0].value(), &ParamValue::I64(7));
}
