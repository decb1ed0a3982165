use roster_macros::Entity;

#[derive(Entity)]
struct TwoIds {
    #[fetch(id)]
    id: Option<i64>,
    #[fetch(id)]
    other: i64,
}

fn main() {}
