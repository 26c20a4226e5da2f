//! Generic repository over one entity type.
//!
//! # Responsibility
//! - Provide add/remove/save and paginated listing for any [`Entity`].
//! - Open a fresh connection per call and release it before returning.
//!
//! # Invariants
//! - A `None` entity returns `Ok(false)` without opening a connection.
//! - Writes stage a detached copy; the caller's value is never handed on.
//! - The list pipeline always runs filter, count, order, page, extender in
//!   that order. A call without a page gets the first [`MIN_TAKE`] rows.
//!
//! [`MIN_TAKE`]: crate::query::MIN_TAKE
//!
//! # See also
//! - `crate::query` for the pipeline building blocks.

use crate::db::{DbSession, EntityState, SharedContext};
use crate::model::entity::Entity;
use crate::query::{count_sql, select_sql, Extender, Filter, ListQuery, Listing, OrderBy, Page};
use crate::repo::{RepoError, RepoResult};
use async_trait::async_trait;
use log::{debug, info};
use rusqlite::params_from_iter;
use std::sync::Arc;
use std::time::Instant;

/// Repository contract for one entity type.
///
/// Async listing runs its SQLite work on Tokio's blocking pool, so callers
/// must be inside a Tokio runtime.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Inserts `entity`. Returns whether at least one row was written.
    fn add(&self, entity: Option<&E>) -> RepoResult<bool>;

    /// Deletes `entity` by key. Returns whether at least one row was removed.
    fn remove(&self, entity: Option<&E>) -> RepoResult<bool>;

    /// Updates `entity` by key. Returns whether at least one row changed.
    fn save(&self, entity: Option<&E>) -> RepoResult<bool>;

    /// Lists entities through the filter/count/order/page/extend pipeline.
    async fn get_list_from_db(&self, query: ListQuery<E>) -> RepoResult<Listing<E>>;

    /// Returns the first entity matching `filter`, with default ordering and
    /// extender applied.
    async fn fill_detail(&self, filter: Filter) -> RepoResult<Option<E>>;
}

/// SQLite-backed [`Repository`] with per-instance defaults.
pub struct DbService<E: Entity> {
    context: SharedContext,
    default_order: Option<OrderBy>,
    default_extender: Option<Extender<E>>,
}

impl<E: Entity> DbService<E> {
    pub fn new(context: SharedContext) -> Self {
        Self {
            context,
            default_order: None,
            default_extender: None,
        }
    }

    /// Ordering used when a list call does not supply one.
    pub fn with_default_order(mut self, order_by: OrderBy) -> Self {
        self.default_order = Some(order_by);
        self
    }

    /// Extender used when a list call does not supply one.
    pub fn with_default_extender(mut self, extender: Extender<E>) -> Self {
        self.default_extender = Some(extender);
        self
    }

    pub fn table(&self) -> &'static str {
        E::TABLE
    }

    fn write(&self, entity: Option<&E>, state: EntityState) -> RepoResult<bool> {
        let Some(entity) = entity else {
            debug!(
                "event=repo_write module=repo status=skipped reason=no_entity table={} state={}",
                E::TABLE,
                state.as_str()
            );
            return Ok(false);
        };

        let started_at = Instant::now();
        let mut session = DbSession::open(self.context.as_ref())?;
        session.stage(entity, state)?;
        let affected = session.commit()?;
        info!(
            "event=repo_write module=repo status=ok table={} state={} rows={} duration_ms={}",
            E::TABLE,
            state.as_str(),
            affected,
            started_at.elapsed().as_millis()
        );
        Ok(affected > 0)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for DbService<E> {
    fn add(&self, entity: Option<&E>) -> RepoResult<bool> {
        self.write(entity, EntityState::Added)
    }

    fn remove(&self, entity: Option<&E>) -> RepoResult<bool> {
        self.write(entity, EntityState::Deleted)
    }

    fn save(&self, entity: Option<&E>) -> RepoResult<bool> {
        self.write(entity, EntityState::Modified)
    }

    async fn get_list_from_db(&self, query: ListQuery<E>) -> RepoResult<Listing<E>> {
        let context = Arc::clone(&self.context);
        let plan = ListPlan {
            filter: query.filter,
            order_by: query.order_by.or_else(|| self.default_order.clone()),
            page: query.page.unwrap_or_else(Page::default_window).clamped(),
            extender: query.extender.or_else(|| self.default_extender.clone()),
        };

        tokio::task::spawn_blocking(move || run_list(&context, plan))
            .await
            .map_err(|err| RepoError::Join(err.to_string()))?
    }

    async fn fill_detail(&self, filter: Filter) -> RepoResult<Option<E>> {
        let listing = self
            .get_list_from_db(ListQuery::new().filter(filter).page(0, 1))
            .await?;
        Ok(listing.items.into_iter().next())
    }
}

struct ListPlan<E> {
    filter: Option<Filter>,
    order_by: Option<OrderBy>,
    page: Page,
    extender: Option<Extender<E>>,
}

fn run_list<E: Entity>(context: &SharedContext, plan: ListPlan<E>) -> RepoResult<Listing<E>> {
    let started_at = Instant::now();
    let session = DbSession::open(context.as_ref())?;
    let conn = session.connection();

    let (sql, params) = count_sql::<E>(plan.filter.as_ref());
    let total = conn.query_row(&sql, params_from_iter(params), |row| row.get::<_, i64>(0))?;
    let total = u64::try_from(total)
        .map_err(|_| RepoError::InvalidData(format!("negative row count {total}")))?;

    let (sql, params) = select_sql::<E>(plan.filter.as_ref(), plan.order_by.as_ref(), plan.page);
    let mut items = Vec::new();
    {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        while let Some(row) = rows.next()? {
            items.push(E::from_row(row)?);
        }
    }

    if let Some(extender) = plan.extender.as_ref() {
        extender(conn, &mut items)?;
    }

    info!(
        "event=repo_list module=repo status=ok table={} rows={} total={} duration_ms={}",
        E::TABLE,
        items.len(),
        total,
        started_at.elapsed().as_millis()
    );
    Ok(Listing { items, total })
}
