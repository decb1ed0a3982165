use std::fmt;

use roster::Entity;

/// A member of the roster. `id` is assigned by storage on insert.
#[derive(Entity, Clone, Debug, Default, PartialEq, Eq)]
pub struct Member {
    #[fetch(id)]
    pub id: Option<i64>,
    pub name: String,
    pub nick_name: Option<String>,
    pub age: Option<i32>,
}

impl Member {
    /// An unsaved member with every profile field set.
    pub fn new(name: impl Into<String>, nick_name: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            nick_name: Some(nick_name.into()),
            age: Some(age),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Member [id={}, name={}]", id, self.name),
            None => write!(f, "Member [id=null, name={}]", self.name),
        }
    }
}
