use roster_macros::Entity;

#[derive(Entity)]
struct Member {
    #[fetch(id)]
    id: Option<i64>,
    name: String,
}

fn main() {
    let _ = Member::COLUMNS.nmae.eq("잔다르크");
}
