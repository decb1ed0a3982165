use roster_macros::Entity;

#[derive(Entity)]
struct Tagged {
    #[fetch(id)]
    id: Option<i64>,
    tags: Vec<String>,
}

fn main() {}
