//! Typed query building.
//!
//! `#[derive(Entity)]` emits a `<Entity>Columns` struct holding one [`Column`] per
//! persisted field, reachable as `<Entity>::COLUMNS`. Because the set of columns is a
//! plain struct, naming a field the entity does not have is a compile error rather
//! than a runtime SQL error:
//!
//! ```ignore
//! let q = Query::from(Member::COLUMNS.name.eq("잔다르크"));
//! let found: Option<Member> = repo.fetch_one(q).await?;
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::ParamValue;

/// A column of entity `E` holding values of type `T`.
pub struct Column<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Column<E, T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `column = value`
    pub fn eq<V>(&self, value: V) -> Predicate<E>
    where
        V: Into<T>,
        T: Into<ParamValue>,
    {
        let typed: T = value.into();
        Predicate {
            column: self.name,
            op: Operator::Eq,
            value: typed.into(),
            _marker: PhantomData,
        }
    }
}

// Manual impls: derives would put bounds on `E` and `T`.
impl<E, T> Clone for Column<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Column<E, T> {}

impl<E, T> fmt::Debug for Column<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.name).finish()
    }
}

/// Comparison operator of a predicate. Equality is the only shape supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
}

impl Operator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
        }
    }
}

/// A single condition on one column of entity `E`.
pub struct Predicate<E> {
    column: &'static str,
    op: Operator,
    value: ParamValue,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Predicate<E> {
    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Self {
            column: self.column,
            op: self.op,
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("column", &self.column)
            .field("op", &self.op)
            .field("value", &self.value)
            .finish()
    }
}

/// A SELECT over entity `E`: predicates joined with AND, optionally limited.
pub struct Query<E> {
    predicates: Vec<Predicate<E>>,
    limit: Option<usize>,
}

impl<E> Query<E> {
    /// Every row of the entity's table.
    pub fn all() -> Self {
        Self {
            predicates: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(predicate: Predicate<E>) -> Self {
        Self {
            predicates: vec![predicate],
            limit: None,
        }
    }

    pub fn and(mut self, predicate: Predicate<E>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicates(&self) -> &[Predicate<E>] {
        &self.predicates
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }
}

impl<E> From<Predicate<E>> for Query<E> {
    fn from(p: Predicate<E>) -> Self {
        Query::filter(p)
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            limit: self.limit,
        }
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("predicates", &self.predicates)
            .field("limit", &self.limit)
            .finish()
    }
}
