//! Plan compilation: `ListPlan` → SeaQuery statements → rows.

use listing_core::{
    build_meta, FilterOperator, FilterValue, ListMode, ListOpts, ListPage, ListPlan, SortDir,
    TagPredicate,
};
use sea_orm::sea_query::{
    Alias, Expr, Func, LikeExpr, Order, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{ConnectionTrait, FromQueryResult, Value};

use crate::exec::ExecGuard;
use crate::tags::TagJoin;
use crate::{DbError, Result};

const LIKE_ESCAPE: char = '!';

/// One compiled `WHERE` conjunct.
#[derive(Clone, Debug)]
pub enum Predicate {
    /// Case-insensitive substring match of `term` against `sql`.
    Search { sql: String, term: String },
    /// Tag membership through a correlated semi-join aliased `alias`.
    Tag {
        join: TagJoin,
        alias: String,
        tag: TagPredicate,
    },
    Filter {
        sql: String,
        op: FilterOperator,
        values: Vec<FilterValue>,
    },
}

impl Predicate {
    pub fn to_expr(&self) -> Result<SimpleExpr> {
        match self {
            Predicate::Search { sql, term } => Ok(contains_ci(sql, term)),
            Predicate::Tag { join, alias, tag } => Ok(join.exists(alias, tag)),
            Predicate::Filter { sql, op, values } => filter_expr(sql, *op, values),
        }
    }
}

fn filter_expr(sql: &str, op: FilterOperator, values: &[FilterValue]) -> Result<SimpleExpr> {
    let first = || {
        values
            .first()
            .cloned()
            .map(to_value)
            .ok_or_else(|| DbError::InvalidPlan(format!("{} filter without value", op.as_str())))
    };
    let lhs = || Expr::expr(Expr::cust(sql.to_string()));

    Ok(match op {
        FilterOperator::Eq => lhs().eq(first()?),
        FilterOperator::Ne => lhs().ne(first()?),
        FilterOperator::Gt => lhs().gt(first()?),
        FilterOperator::Ge => lhs().gte(first()?),
        FilterOperator::Lt => lhs().lt(first()?),
        FilterOperator::Le => lhs().lte(first()?),
        FilterOperator::In if values.len() == 1 => lhs().eq(first()?),
        FilterOperator::In => lhs().is_in(values.iter().cloned().map(to_value)),
        FilterOperator::Like => match values.first() {
            Some(FilterValue::String(s)) => contains_ci(sql, s),
            _ => {
                return Err(DbError::InvalidPlan(
                    "like filter needs a string value".to_string(),
                ))
            }
        },
    })
}

fn contains_ci(sql: &str, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", like_escape(&term.to_lowercase()));
    Expr::expr(Func::lower(Expr::cust(sql.to_string())))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

/// Escape `LIKE` metacharacters so the term matches literally.
pub(crate) fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

fn to_value(v: FilterValue) -> Value {
    match v {
        FilterValue::String(s) => Value::from(s),
        FilterValue::I64(i) => Value::from(i),
        FilterValue::F64(f) => Value::from(f),
        FilterValue::Bool(b) => Value::from(b),
        FilterValue::DateTime(dt) => Value::from(dt),
    }
}

/// AND every predicate into `select`.
pub fn apply_all(select: &mut SelectStatement, predicates: &[Predicate]) -> Result<()> {
    for p in predicates {
        select.and_where(p.to_expr()?);
    }
    Ok(())
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// A plan bound to a tenant-scoped base statement.
///
/// `base` carries `FROM`, joins and scoping predicates only; projection,
/// filtering, ordering and paging come from the plan.
pub struct ListQuery<'a> {
    base: SelectStatement,
    opts: &'a ListOpts,
    plan: &'a ListPlan,
    tags: Option<&'a TagJoin>,
}

impl<'a> ListQuery<'a> {
    pub fn new(base: SelectStatement, opts: &'a ListOpts, plan: &'a ListPlan) -> Self {
        Self {
            base,
            opts,
            plan,
            tags: None,
        }
    }

    pub fn with_tags(mut self, join: &'a TagJoin) -> Self {
        self.tags = Some(join);
        self
    }

    fn field_sql(&self, name: &str) -> Result<&'a str> {
        self.opts
            .registry
            .get(name)
            .and_then(|f| f.sql())
            .ok_or_else(|| DbError::InvalidPlan(format!("field '{name}' has no expression")))
    }

    /// Search, then tags, then attribute filters.
    pub fn predicates(&self) -> Result<Vec<Predicate>> {
        let mut out = Vec::new();

        if let Some(term) = &self.plan.search {
            let sql = self
                .opts
                .search_sql()
                .ok_or_else(|| DbError::InvalidPlan("search is not enabled".to_string()))?;
            out.push(Predicate::Search {
                sql: sql.to_string(),
                term: term.clone(),
            });
        }

        if !self.plan.tags.is_empty() {
            let join = self
                .tags
                .ok_or_else(|| DbError::InvalidPlan("tag filter without tag relation".to_string()))?;
            for (i, tag) in self.plan.tags.iter().enumerate() {
                out.push(Predicate::Tag {
                    join: join.clone(),
                    alias: format!("t{i}"),
                    tag: tag.clone(),
                });
            }
        }

        for spec in &self.plan.filters {
            let field = self
                .opts
                .registry
                .get(&spec.field)
                .ok_or_else(|| DbError::InvalidPlan(format!("unknown field '{}'", spec.field)))?;
            let sql = self.field_sql(&spec.field)?;
            let values = spec
                .coerce(field.kind)
                .map_err(|e| DbError::InvalidPlan(e.to_string()))?;
            out.push(Predicate::Filter {
                sql: sql.to_string(),
                op: spec.op,
                values,
            });
        }

        Ok(out)
    }

    /// Projection plus every predicate; no ordering, no paging.
    pub fn filtered(&self) -> Result<SelectStatement> {
        let mut select = self.base.clone();
        for (alias, sql) in self.opts.registry.projection() {
            select.expr_as(Expr::cust(sql.to_string()), Alias::new(alias));
        }
        apply_all(&mut select, &self.predicates()?)?;
        Ok(select)
    }

    pub fn count_statement(&self) -> Result<SelectStatement> {
        let mut count = Query::select();
        count
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("total"))
            .from_subquery(self.filtered()?, Alias::new("sub"));
        Ok(count)
    }

    /// Ordered rows; bounded by the page in list mode, everything in export mode.
    pub fn page_statement(&self) -> Result<SelectStatement> {
        let mut select = self.filtered()?;
        for key in &self.plan.sort {
            let order = match key.dir {
                SortDir::Asc => Order::Asc,
                SortDir::Desc => Order::Desc,
            };
            select.order_by_expr(Expr::cust(self.field_sql(&key.field)?.to_string()), order);
        }

        if let (ListMode::List, Some(page)) = (self.plan.mode, self.plan.page) {
            match page.sql_limit() {
                Some(limit) => {
                    select.limit(limit);
                }
                // Some engines reject OFFSET without LIMIT.
                None if page.offset > 0 => {
                    select.limit(i64::MAX as u64);
                }
                None => {}
            }
            if page.offset > 0 {
                select.offset(page.sql_offset());
            }
        }
        Ok(select)
    }

    /// Count, then fetch one page. Two statements, no shared snapshot.
    pub async fn fetch_page<R, C>(&self, conn: &C, guard: &ExecGuard) -> Result<ListPage<R>>
    where
        R: FromQueryResult,
        C: ConnectionTrait,
    {
        let page = self
            .plan
            .page
            .ok_or_else(|| DbError::InvalidPlan("list query without page".to_string()))?;
        let backend = conn.get_database_backend();

        let count_stmt = backend.build(&self.count_statement()?);
        tracing::debug!(entity = self.opts.registry.entity(), sql = %count_stmt, "count query");
        let total = guard
            .run(CountRow::find_by_statement(count_stmt).one(conn))
            .await?
            .map(|row| row.total)
            .unwrap_or(0);
        let total = u64::try_from(total).unwrap_or(0);

        let items = if page.limit == 0 {
            Vec::new()
        } else {
            let stmt = backend.build(&self.page_statement()?);
            tracing::debug!(entity = self.opts.registry.entity(), sql = %stmt, "page query");
            guard.run(R::find_by_statement(stmt).all(conn)).await?
        };

        Ok(ListPage::new(items, build_meta(total, page)))
    }

    /// Every matching row in plan order.
    pub async fn fetch_all<R, C>(&self, conn: &C, guard: &ExecGuard) -> Result<Vec<R>>
    where
        R: FromQueryResult,
        C: ConnectionTrait,
    {
        let stmt = conn.get_database_backend().build(&self.page_statement()?);
        tracing::debug!(entity = self.opts.registry.entity(), sql = %stmt, "export query");
        guard.run(R::find_by_statement(stmt).all(conn)).await
    }
}
