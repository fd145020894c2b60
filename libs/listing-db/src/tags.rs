//! Tag-membership relation: `EXISTS` semi-joins and per-entity tag lookup.

use std::collections::HashMap;

use listing_core::TagPredicate;
use sea_orm::sea_query::{Alias, Expr, Order, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, FromQueryResult};
use serde::{Deserialize, Serialize};

use crate::exec::ExecGuard;
use crate::Result;

/// Ids per lookup statement; keeps bind parameters well under driver limits.
const TAG_LOOKUP_CHUNK: usize = 500;

/// Physical layout of the tag relation.
#[derive(Clone, Debug)]
pub struct TagSource {
    pub table: &'static str,
    pub entity_column: &'static str,
    pub namespace_column: &'static str,
    pub key_column: &'static str,
    pub value_column: &'static str,
}

/// Tag relation correlated to an outer query through `join_key`.
#[derive(Clone, Debug)]
pub struct TagJoin {
    pub source: TagSource,
    /// Outer SQL expression matched against `source.entity_column`.
    pub join_key: &'static str,
}

impl TagJoin {
    pub fn new(source: TagSource, join_key: &'static str) -> Self {
        Self { source, join_key }
    }

    /// `EXISTS (SELECT 1 FROM <table> AS <alias> WHERE ...)` for one predicate.
    pub fn exists(&self, alias: &str, tag: &TagPredicate) -> SimpleExpr {
        let a = Alias::new(alias);
        let col = |name: &'static str| Expr::col((a.clone(), Alias::new(name)));

        let mut sub = Query::select();
        sub.expr(Expr::val(1))
            .from_as(Alias::new(self.source.table), a.clone())
            .and_where(col(self.source.entity_column).eq(Expr::cust(self.join_key)))
            .and_where(col(self.source.namespace_column).eq(tag.namespace.clone()))
            .and_where(col(self.source.key_column).eq(tag.key.clone()));
        if let Some(value) = &tag.value {
            sub.and_where(col(self.source.value_column).eq(value.clone()));
        }

        Expr::exists(sub)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub namespace: String,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct TagRow {
    entity_id: String,
    namespace: String,
    key: String,
    value: Option<String>,
}

/// Tags for each of `ids`, ordered by namespace then key. Ids without tags are absent.
pub async fn load_tags<C>(
    conn: &C,
    source: &TagSource,
    ids: &[String],
    guard: &ExecGuard,
) -> Result<HashMap<String, Vec<Tag>>>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let t = Alias::new("t");
    let col = |name: &'static str| (t.clone(), Alias::new(name));
    let mut out: HashMap<String, Vec<Tag>> = HashMap::new();

    for chunk in ids.chunks(TAG_LOOKUP_CHUNK) {
        let mut q = Query::select();
        q.expr_as(Expr::col(col(source.entity_column)), Alias::new("entity_id"))
            .expr_as(Expr::col(col(source.namespace_column)), Alias::new("namespace"))
            .expr_as(Expr::col(col(source.key_column)), Alias::new("key"))
            .expr_as(Expr::col(col(source.value_column)), Alias::new("value"))
            .from_as(Alias::new(source.table), t.clone())
            .and_where(Expr::col(col(source.entity_column)).is_in(chunk.iter().cloned()))
            .order_by(col(source.entity_column), Order::Asc)
            .order_by(col(source.namespace_column), Order::Asc)
            .order_by(col(source.key_column), Order::Asc);

        let stmt = backend.build(&q);
        let rows = guard
            .run(TagRow::find_by_statement(stmt).all(conn))
            .await?;
        for row in rows {
            out.entry(row.entity_id).or_default().push(Tag {
                namespace: row.namespace,
                key: row.key,
                value: row.value,
            });
        }
    }

    Ok(out)
}
