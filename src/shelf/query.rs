//! # Query Pipeline
//!
//! A [`Query`] is an immutable description of what to read from a
//! collection: predicates, at most one sort, and trims (`head`/`tail`).
//! Building a query never touches the disk. Every builder call returns a new
//! query, so a base query can be forked freely:
//!
//! ```ignore
//! let published = posts.filter(|p| !p.draft);
//! let newest = published.order_by("-date").head(3);
//! let oldest = published.order_by("date").head(3);
//! ```
//!
//! ## Materialization
//!
//! `to_list`, `iter`, `count`, `first`, `last` and `exists` run the pipeline:
//!
//! 1. load every file of the collection's format (cached records are reused);
//! 2. keep records that satisfy every predicate, in the order they were added;
//! 3. stable-sort by the sort field, if any;
//! 4. apply trims in the order they were added.
//!
//! Without `order_by`, records come back in path order.

use crate::collection::Collection;
use crate::error::{Result, ShelfError};
use crate::filter::FieldFilter;
use crate::tracker::Entry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

type Predicate<'c, T> = Rc<dyn Fn(&T) -> bool + 'c>;

/// Field and direction to sort by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortInstruction {
    pub field: String,
    pub descending: bool,
}

impl SortInstruction {
    /// Parse `"field"` (ascending) or `"-field"` (descending).
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: spec.to_string(),
                descending: false,
            },
        }
    }
}

/// Post-sort trimming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Head(usize),
    Tail(usize),
}

impl Trim {
    fn apply<X>(self, mut items: Vec<X>) -> Vec<X> {
        match self {
            Trim::Head(n) => {
                items.truncate(n);
                items
            }
            Trim::Tail(n) => {
                let start = items.len().saturating_sub(n);
                items.split_off(start)
            }
        }
    }
}

pub struct Query<'c, T> {
    collection: &'c Collection<T>,
    predicates: Vec<Predicate<'c, T>>,
    sort: Option<SortInstruction>,
    trims: Vec<Trim>,
}

impl<T> Clone for Query<'_, T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection,
            predicates: self.predicates.clone(),
            sort: self.sort.clone(),
            trims: self.trims.clone(),
        }
    }
}

impl<T> fmt::Debug for Query<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("root", &self.collection.root())
            .field("predicates", &self.predicates.len())
            .field("sort", &self.sort)
            .field("trims", &self.trims)
            .finish()
    }
}

impl<'c, T> Query<'c, T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(collection: &'c Collection<T>) -> Self {
        Self {
            collection,
            predicates: Vec::new(),
            sort: None,
            trims: Vec::new(),
        }
    }

    // --- Building ---

    /// Keep only records for which `predicate` holds.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'c,
    {
        let mut next = self.clone();
        next.predicates.push(Rc::new(predicate));
        next
    }

    /// Keep only records matching a field condition.
    pub fn filter_field(&self, filter: FieldFilter) -> Self {
        self.filter(move |record| filter.matches(record))
    }

    /// Sort by a field; a leading `-` sorts descending. Replaces any earlier
    /// sort.
    pub fn order_by(&self, field: &str) -> Self {
        let mut next = self.clone();
        next.sort = Some(SortInstruction::parse(field));
        next
    }

    /// Keep the first `n` records.
    pub fn head(&self, n: usize) -> Self {
        self.trimmed(Trim::Head(n))
    }

    /// Keep the last `n` records.
    pub fn tail(&self, n: usize) -> Self {
        self.trimmed(Trim::Tail(n))
    }

    /// [`Query::head`] for a signed count; negative counts are rejected.
    pub fn try_head(&self, n: i64) -> Result<Self> {
        Ok(self.head(non_negative("head", n)?))
    }

    /// [`Query::tail`] for a signed count; negative counts are rejected.
    pub fn try_tail(&self, n: i64) -> Result<Self> {
        Ok(self.tail(non_negative("tail", n)?))
    }

    pub fn sort_instruction(&self) -> Option<&SortInstruction> {
        self.sort.as_ref()
    }

    fn trimmed(&self, trim: Trim) -> Self {
        let mut next = self.clone();
        next.trims.push(trim);
        next
    }

    // --- Materializing ---

    pub fn to_list(&self) -> Result<Vec<Entry<T>>> {
        let mut items = Vec::new();
        for path in self.collection.paths()? {
            items.push(self.collection.load(&path, false)?);
        }

        for predicate in &self.predicates {
            items.retain(|entry| predicate(&*entry.borrow()));
        }

        if let Some(sort) = &self.sort {
            items = sort_entries(items, sort)?;
        }

        for trim in &self.trims {
            items = trim.apply(items);
        }
        Ok(items)
    }

    pub fn iter(&self) -> Result<std::vec::IntoIter<Entry<T>>> {
        Ok(self.to_list()?.into_iter())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.to_list()?.len())
    }

    pub fn first(&self) -> Result<Option<Entry<T>>> {
        Ok(self.to_list()?.into_iter().next())
    }

    pub fn last(&self) -> Result<Option<Entry<T>>> {
        Ok(self.to_list()?.pop())
    }

    /// Whether at least one record comes out of the pipeline.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.first()?.is_some())
    }
}

fn non_negative(op: &str, n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| {
        ShelfError::Validation(format!("{} expects a non-negative integer, got {}", op, n))
    })
}

/// Stable sort on the serialized value of the sort field. A record without
/// the field sorts as null.
fn sort_entries<T: Serialize>(
    items: Vec<Entry<T>>,
    sort: &SortInstruction,
) -> Result<Vec<Entry<T>>> {
    let mut keyed = Vec::with_capacity(items.len());
    for entry in items {
        let key = match serde_json::to_value(&*entry.borrow())? {
            Value::Object(mut fields) => fields.remove(&sort.field).unwrap_or(Value::Null),
            _ => {
                return Err(ShelfError::Validation(
                    "record does not serialize to a map of fields".into(),
                ))
            }
        };
        keyed.push((key, entry));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        let ord = compare_values(a, b);
        if sort.descending {
            ord.reverse()
        } else {
            ord
        }
    });
    Ok(keyed.into_iter().map(|(_, entry)| entry).collect())
}

/// Total order over field values.
///
/// Values of different kinds order as null < bool < number < string < array
/// < object. Numbers compare numerically, strings lexicographically (which is
/// chronological for ISO-8601 dates), arrays element by element. Objects are
/// all equal to each other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x.cmp(&y)
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x.cmp(&y)
            } else {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| compare_values(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}
