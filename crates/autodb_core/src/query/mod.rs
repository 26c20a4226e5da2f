//! List query building blocks: predicate, ordering, page window, extender.
//!
//! # Responsibility
//! - Express caller-supplied filtering/ordering/paging as bound SQL.
//! - Carry the post-materialization extender used for eager loading.
//!
//! # Invariants
//! - User values are always bound parameters, never spliced into SQL text.
//! - Column names are quoted identifiers.
//! - A page window always has `skip >= 0` and `take >= MIN_TAKE` once clamped.

use crate::model::entity::Entity;
use crate::repo::RepoResult;
use crate::sql::quote_ident;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Smallest page size a list query will request.
pub const MIN_TAKE: i64 = 5;

/// Boolean predicate over one table, as a SQL fragment plus bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    clause: String,
    params: Vec<Value>,
}

impl Filter {
    /// Raw predicate with `?` placeholders matched by `params` in order.
    pub fn raw(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            params,
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "=", value.into())
    }

    pub fn ne(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<>", value.into())
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, ">", value.into())
    }

    pub fn ge(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, ">=", value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<", value.into())
    }

    pub fn le(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, "<=", value.into())
    }

    /// SQL `LIKE` with the caller's pattern.
    pub fn like(column: &str, pattern: impl Into<String>) -> Self {
        Self::compare(column, "LIKE", Value::Text(pattern.into()))
    }

    pub fn is_null(column: &str) -> Self {
        Self::raw(format!("{} IS NULL", quote_ident(column)), Vec::new())
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::raw(format!("{} IS NOT NULL", quote_ident(column)), Vec::new())
    }

    /// Membership test; an empty set matches nothing.
    pub fn in_list<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let params = values.into_iter().map(Into::into).collect::<Vec<_>>();
        if params.is_empty() {
            return Self::raw("0 = 1", Vec::new());
        }
        let placeholders = vec!["?"; params.len()].join(", ");
        Self::raw(
            format!("{} IN ({placeholders})", quote_ident(column)),
            params,
        )
    }

    pub fn and(self, other: Filter) -> Self {
        self.join("AND", other)
    }

    pub fn or(self, other: Filter) -> Self {
        self.join("OR", other)
    }

    pub fn negate(self) -> Self {
        Self {
            clause: format!("NOT ({})", self.clause),
            params: self.params,
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    fn compare(column: &str, op: &str, value: Value) -> Self {
        Self::raw(format!("{} {op} ?", quote_ident(column)), vec![value])
    }

    fn join(mut self, op: &str, other: Filter) -> Self {
        self.params.extend(other.params);
        Self {
            clause: format!("({}) {op} ({})", self.clause, other.clause),
            params: self.params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering terms applied left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    terms: Vec<(String, Direction)>,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self {
            terms: vec![(column.to_string(), Direction::Asc)],
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            terms: vec![(column.to_string(), Direction::Desc)],
        }
    }

    pub fn then_asc(mut self, column: &str) -> Self {
        self.terms.push((column.to_string(), Direction::Asc));
        self
    }

    pub fn then_desc(mut self, column: &str) -> Self {
        self.terms.push((column.to_string(), Direction::Desc));
        self
    }

    fn to_sql(&self) -> String {
        self.terms
            .iter()
            .map(|(column, direction)| {
                let direction = match direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{} {direction}", quote_ident(column))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Page window in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub take: i64,
}

impl Page {
    pub fn new(skip: i64, take: i64) -> Self {
        Self { skip, take }
    }

    /// Window used when a list call names none: the first [`MIN_TAKE`] rows.
    pub fn default_window() -> Self {
        Self::new(0, 0).clamped()
    }

    /// Clamps `skip` to at least 0 and `take` to at least [`MIN_TAKE`].
    pub fn clamped(self) -> Self {
        Self {
            skip: self.skip.max(0),
            take: self.take.max(MIN_TAKE),
        }
    }
}

/// Hook run on the materialized rows, with the same connection, before the
/// list is returned. Used for eager loading of related data.
pub type Extender<E> = Arc<dyn Fn(&Connection, &mut Vec<E>) -> RepoResult<()> + Send + Sync>;

/// Wraps a closure as an [`Extender`].
pub fn extender<E, F>(f: F) -> Extender<E>
where
    F: Fn(&Connection, &mut Vec<E>) -> RepoResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Caller options for one list call. Unset stages fall back to repository
/// defaults; an unset page falls back to [`Page::default_window`].
pub struct ListQuery<E> {
    pub filter: Option<Filter>,
    pub order_by: Option<OrderBy>,
    pub extender: Option<Extender<E>>,
    pub page: Option<Page>,
}

impl<E> ListQuery<E> {
    pub fn new() -> Self {
        Self {
            filter: None,
            order_by: None,
            extender: None,
            page: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn extend(mut self, extender: Extender<E>) -> Self {
        self.extender = Some(extender);
        self
    }

    pub fn page(mut self, skip: i64, take: i64) -> Self {
        self.page = Some(Page::new(skip, take));
        self
    }
}

impl<E> Default for ListQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ListQuery<E> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            order_by: self.order_by.clone(),
            extender: self.extender.clone(),
            page: self.page,
        }
    }
}

impl<E> Debug for ListQuery<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListQuery")
            .field("filter", &self.filter)
            .field("order_by", &self.order_by)
            .field("extender", &self.extender.is_some())
            .field("page", &self.page)
            .finish()
    }
}

/// One materialized page plus the match count before paging.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<E> {
    pub items: Vec<E>,
    pub total: u64,
}

impl<E> Listing<E> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&E> {
        self.items.first()
    }
}

pub(crate) fn count_sql<E: Entity>(filter: Option<&Filter>) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(E::TABLE));
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, filter);
    (sql, params)
}

/// SELECT for the list pipeline: filter, then ordering, then page window.
pub(crate) fn select_sql<E: Entity>(
    filter: Option<&Filter>,
    order_by: Option<&OrderBy>,
    page: Page,
) -> (String, Vec<Value>) {
    let columns = std::iter::once(E::KEY_COLUMN)
        .chain(E::COLUMNS.iter().copied())
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("SELECT {columns} FROM {}", quote_ident(E::TABLE));
    let mut params = Vec::new();
    push_where(&mut sql, &mut params, filter);

    if let Some(order_by) = order_by.filter(|order_by| !order_by.terms.is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.to_sql());
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    params.push(Value::Integer(page.take));
    params.push(Value::Integer(page.skip));

    (sql, params)
}

fn push_where(sql: &mut String, params: &mut Vec<Value>, filter: Option<&Filter>) {
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.clause);
        params.extend(filter.params.iter().cloned());
    }
}
