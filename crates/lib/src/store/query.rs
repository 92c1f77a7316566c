//! Field-clause queries over a single collection.

use std::cmp::Ordering;

use crate::path::CollectionPath;
use crate::value::{Fields, Value};

/// Comparison operator of a query [`Clause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Field value equals one of the values in the clause's list
    In,
    /// Field is a list containing the clause value
    ArrayContains,
}

/// One `(field, op, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Clause {
    /// True if `data` satisfies this clause. Missing fields never match.
    pub fn matches(&self, data: &Fields) -> bool {
        let Some(actual) = data.get(&self.field) else {
            return false;
        };
        match self.op {
            Op::Eq => actual == &self.value,
            Op::Ne => actual != &self.value,
            Op::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            Op::Le => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Op::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            Op::Ge => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::In => match &self.value {
                Value::List(options) => options.contains(actual),
                _ => false,
            },
            Op::ArrayContains => match actual {
                Value::List(items) => items.contains(&self.value),
                _ => false,
            },
        }
    }
}

/// Orders two values of comparable kinds; mixed kinds are unordered.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Query over one collection: every clause must match.
///
/// ```
/// use stagedoc::{CollectionPath, Op, Query};
///
/// let query = Query::new(CollectionPath::new("users").unwrap())
///     .filter("email", Op::Eq, "ada@example.com")
///     .limit(1);
/// assert_eq!(query.clauses().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: CollectionPath,
    clauses: Vec<Clause>,
    limit: Option<usize>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            clauses: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    pub fn matches(&self, data: &Fields) -> bool {
        self.clauses.iter().all(|c| c.matches(data))
    }
}
