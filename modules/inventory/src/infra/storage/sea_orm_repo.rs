//! SeaORM-backed implementation of the `InventoryRepository` port.
//!
//! Each endpoint contributes only a tenant-scoped base statement; projection,
//! filtering, ordering and paging come from the validated plan.

use std::sync::Arc;

use async_trait::async_trait;
use listing_core::{ListOpts, ListPage, ListPlan};
use listing_db::{load_tags, ExecGuard, ListQuery, TagJoin, TagSource};
use sea_orm::sea_query::{Alias, Expr, JoinType, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult};

use crate::domain::model::{AdvisoryRow, PackageRow, SystemExportRow, SystemRow};
use crate::domain::registry::Catalog;
use crate::domain::repo::InventoryRepository;

/// Tag membership of systems, keyed by inventory id.
pub const SYSTEM_TAGS: TagSource = TagSource {
    table: "system_tags",
    entity_column: "inventory_id",
    namespace_column: "namespace",
    key_column: "key",
    value_column: "value",
};

fn col(table: &str, column: &str) -> (Alias, Alias) {
    (Alias::new(table), Alias::new(column))
}

/// `JOIN rh_account ra ON ra.id = <owner>.rh_account_id WHERE ra.name = <account>`
fn scope_to_account(q: &mut SelectStatement, owner: &str, account: &str) {
    q.join_as(
        JoinType::InnerJoin,
        Alias::new("rh_account"),
        Alias::new("ra"),
        Expr::col(col("ra", "id")).equals(col(owner, "rh_account_id")),
    )
    .and_where(Expr::col(col("ra", "name")).eq(account));
}

fn systems_base(account: &str) -> SelectStatement {
    let mut q = Query::select();
    q.from_as(Alias::new("system_platform"), Alias::new("sp"));
    scope_to_account(&mut q, "sp", account);
    q
}

fn advisory_systems_base(account: &str, advisory: &str) -> SelectStatement {
    let mut q = systems_base(account);
    q.join_as(
        JoinType::InnerJoin,
        Alias::new("system_advisories"),
        Alias::new("sa"),
        Expr::col(col("sa", "system_id"))
            .equals(col("sp", "id"))
            .and(Expr::col(col("sa", "rh_account_id")).equals(col("sp", "rh_account_id"))),
    )
    .join_as(
        JoinType::InnerJoin,
        Alias::new("advisory_metadata"),
        Alias::new("am"),
        Expr::col(col("am", "id")).equals(col("sa", "advisory_id")),
    )
    .and_where(Expr::col(col("am", "name")).eq(advisory));
    q
}

fn advisories_base(account: &str) -> SelectStatement {
    let mut q = Query::select();
    q.from_as(Alias::new("advisory_metadata"), Alias::new("am"))
        .join_as(
            JoinType::InnerJoin,
            Alias::new("advisory_account_data"),
            Alias::new("aad"),
            Expr::col(col("aad", "advisory_id")).equals(col("am", "id")),
        )
        .join_as(
            JoinType::LeftJoin,
            Alias::new("advisory_type"),
            Alias::new("at"),
            Expr::col(col("at", "id")).equals(col("am", "advisory_type_id")),
        );
    scope_to_account(&mut q, "aad", account);
    q
}

fn packages_base(account: &str) -> SelectStatement {
    let mut q = Query::select();
    q.from_as(Alias::new("package_name"), Alias::new("pn"))
        .join_as(
            JoinType::InnerJoin,
            Alias::new("package_account_data"),
            Alias::new("pad"),
            Expr::col(col("pad", "package_name_id")).equals(col("pn", "id")),
        );
    scope_to_account(&mut q, "pad", account);
    q
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// Repository over any SeaORM connection.
pub struct SeaOrmInventoryRepository<C = DatabaseConnection>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
    catalog: Arc<Catalog>,
    guard: ExecGuard,
    system_tags: TagJoin,
}

impl<C> SeaOrmInventoryRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C, catalog: Arc<Catalog>, guard: ExecGuard) -> Self {
        Self {
            conn,
            catalog,
            guard,
            system_tags: TagJoin::new(SYSTEM_TAGS, "sp.inventory_id"),
        }
    }

    fn query<'a>(
        &'a self,
        base: SelectStatement,
        opts: &'a ListOpts,
        plan: &'a ListPlan,
    ) -> ListQuery<'a> {
        let query = ListQuery::new(base, opts, plan);
        if opts.tags_enabled {
            query.with_tags(&self.system_tags)
        } else {
            query
        }
    }

    async fn page<R: FromQueryResult>(
        &self,
        base: SelectStatement,
        opts: &ListOpts,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<R>> {
        Ok(self
            .query(base, opts, plan)
            .fetch_page(&self.conn, &self.guard)
            .await?)
    }

    async fn all<R: FromQueryResult>(
        &self,
        base: SelectStatement,
        opts: &ListOpts,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<R>> {
        Ok(self
            .query(base, opts, plan)
            .fetch_all(&self.conn, &self.guard)
            .await?)
    }

    /// Attach each system's tags with one lookup per chunk of ids.
    async fn attach_tags(&self, rows: Vec<SystemRow>) -> anyhow::Result<Vec<SystemExportRow>> {
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let mut tags = load_tags(&self.conn, &self.system_tags.source, &ids, &self.guard).await?;
        Ok(rows
            .into_iter()
            .map(|system| SystemExportRow {
                tags: tags.remove(&system.id).unwrap_or_default(),
                system,
            })
            .collect())
    }
}

#[async_trait]
impl<C> InventoryRepository for SeaOrmInventoryRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn list_systems(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<SystemRow>> {
        self.page(systems_base(account), &self.catalog.systems, plan)
            .await
    }

    async fn export_systems(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<SystemExportRow>> {
        let rows = self
            .all(systems_base(account), &self.catalog.systems_export, plan)
            .await?;
        self.attach_tags(rows).await
    }

    async fn advisory_exists(&self, name: &str) -> anyhow::Result<bool> {
        let mut q = Query::select();
        q.expr_as(Expr::cust("COUNT(*)"), Alias::new("total"))
            .from_as(Alias::new("advisory_metadata"), Alias::new("am"))
            .and_where(Expr::col(col("am", "name")).eq(name));
        let stmt = self.conn.get_database_backend().build(&q);
        let count = self
            .guard
            .run(CountRow::find_by_statement(stmt).one(&self.conn))
            .await?;
        Ok(count.is_some_and(|c| c.total > 0))
    }

    async fn list_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<SystemRow>> {
        self.page(
            advisory_systems_base(account, advisory),
            &self.catalog.advisory_systems,
            plan,
        )
        .await
    }

    async fn export_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<SystemExportRow>> {
        let rows = self
            .all(
                advisory_systems_base(account, advisory),
                &self.catalog.advisory_systems_export,
                plan,
            )
            .await?;
        self.attach_tags(rows).await
    }

    async fn list_advisories(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<AdvisoryRow>> {
        self.page(advisories_base(account), &self.catalog.advisories, plan)
            .await
    }

    async fn export_advisories(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<AdvisoryRow>> {
        self.all(advisories_base(account), &self.catalog.advisories_export, plan)
            .await
    }

    async fn list_packages(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<PackageRow>> {
        self.page(packages_base(account), &self.catalog.packages, plan)
            .await
    }

    async fn export_packages(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<PackageRow>> {
        self.all(packages_base(account), &self.catalog.packages_export, plan)
            .await
    }
}
