//! End-to-end plan execution against a file-backed SQLite database.

use std::sync::Arc;

use anyhow::Result;
use listing_core::{
    build_links, FieldDescriptor, FieldKind, FilterOperator, ListOpts, ListPlan, RawListParams,
    Registry,
};
use listing_db::{load_tags, ConnectOpts, DbHandle, ExecGuard, ListQuery, TagJoin, TagSource};
use sea_orm::sea_query::{Alias, Query, SelectStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult};

#[derive(Debug, FromQueryResult)]
struct Row {
    id: String,
    display_name: String,
    packages_installed: i64,
}

const SOURCE: TagSource = TagSource {
    table: "system_tags",
    entity_column: "inventory_id",
    namespace_column: "namespace",
    key_column: "tag_key",
    value_column: "tag_value",
};

fn opts() -> ListOpts {
    let registry = Registry::builder("system", "id")
        .field(FieldDescriptor::column("id", "sp.inventory_id", FieldKind::String))
        .field(FieldDescriptor::column(
            "display_name",
            "sp.display_name",
            FieldKind::String,
        ))
        .field(FieldDescriptor::column(
            "packages_installed",
            "sp.packages_installed",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::filter_only("stale", "sp.stale", FieldKind::Bool))
        .field(FieldDescriptor::tags("tags"))
        .build()
        .unwrap();
    ListOpts::new(Arc::new(registry))
        .default_filter("stale", FilterOperator::Eq, &["false"])
        .search("display_name")
        .with_tags()
        .build()
        .unwrap()
}

fn base() -> SelectStatement {
    let mut q = Query::select();
    q.from_as(Alias::new("system_platform"), Alias::new("sp"));
    q
}

async fn seeded(dir: &tempfile::TempDir) -> Result<(DbHandle, DatabaseConnection)> {
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("list.db").display());
    let db = DbHandle::connect(&dsn, ConnectOpts::default()).await?;
    let conn = db.sea();

    conn.execute_unprepared(
        "CREATE TABLE system_platform (
            inventory_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            packages_installed INTEGER NOT NULL,
            stale BOOLEAN NOT NULL
        )",
    )
    .await?;
    conn.execute_unprepared(
        "CREATE TABLE system_tags (
            inventory_id TEXT NOT NULL,
            namespace TEXT NOT NULL,
            tag_key TEXT NOT NULL,
            tag_value TEXT
        )",
    )
    .await?;

    // 23 fresh systems plus 2 stale ones.
    for i in 0..25 {
        let stale = i >= 23;
        conn.execute_unprepared(&format!(
            "INSERT INTO system_platform VALUES ('sys-{i:02}', 'Host {i:02}', {}, {})",
            i % 5,
            if stale { 1 } else { 0 }
        ))
        .await?;
    }
    conn.execute_unprepared(
        "INSERT INTO system_tags VALUES
            ('sys-01', 'insights', 'env', 'prod'),
            ('sys-01', 'insights', 'team', 'core'),
            ('sys-02', 'insights', 'env', 'prod'),
            ('sys-03', 'insights', 'env', 'dev'),
            ('sys-24', 'insights', 'env', 'prod')",
    )
    .await?;

    Ok((db, conn))
}

async fn list(conn: &DatabaseConnection, query: &str) -> Result<listing_core::ListPage<Row>> {
    let opts = opts();
    let join = TagJoin::new(SOURCE, "sp.inventory_id");
    let plan = ListPlan::list(&opts, &RawListParams::from_query(Some(query)))?;
    let page = ListQuery::new(base(), &opts, &plan)
        .with_tags(&join)
        .fetch_page(conn, &ExecGuard::unbounded())
        .await?;
    Ok(page)
}

#[tokio::test]
async fn default_filter_hides_stale_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let page = list(&conn, "limit=100").await?;
    assert_eq!(page.meta.total_items, 23);
    assert_eq!(page.items.len(), 23);
    assert_eq!(page.items[0].id, "sys-00");

    let page = list(&conn, "limit=100&filter[stale]=true").await?;
    assert_eq!(page.meta.total_items, 2);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn sort_uses_primary_key_tiebreak() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let page = list(&conn, "limit=6&sort=-packages_installed").await?;
    let ids: Vec<_> = page.items.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        ["sys-04", "sys-09", "sys-14", "sys-19", "sys-03", "sys-08"]
    );
    assert!(page.items.iter().take(4).all(|r| r.packages_installed == 4));

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn walking_next_links_visits_every_row_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let mut seen = Vec::new();
    let mut offset = 0i64;
    loop {
        let query = format!("limit=7&offset={offset}");
        let page = list(&conn, &query).await?;
        seen.extend(page.items.iter().map(|r| r.id.clone()));
        let links = build_links("/systems", Some(&query), &page.meta);
        match links.next {
            Some(next) => {
                offset = next
                    .split(['?', '&'])
                    .find_map(|kv| kv.strip_prefix("offset="))
                    .unwrap()
                    .parse()?;
            }
            None => break,
        }
    }

    let expected: Vec<_> = (0..23).map(|i| format!("sys-{i:02}")).collect();
    assert_eq!(seen, expected);

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn search_and_tags_narrow_results() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let page = list(&conn, "search=HOST%201").await?;
    assert_eq!(page.meta.total_items, 10, "Host 10..19");

    let page = list(&conn, "tags=insights/env=prod").await?;
    let ids: Vec<_> = page.items.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["sys-01", "sys-02"]);

    let page = list(&conn, "tags=insights/env=prod&tags=insights/team").await?;
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].display_name, "Host 01");

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn export_returns_everything_and_tags_load_per_row() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let opts = opts();
    let plan = ListPlan::export(&opts, &RawListParams::from_query(Some("limit=1")))?;
    let guard = ExecGuard::unbounded();
    let rows: Vec<Row> = ListQuery::new(base(), &opts, &plan)
        .fetch_all(&conn, &guard)
        .await?;
    assert_eq!(rows.len(), 23);

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let tags = load_tags(&conn, &SOURCE, &ids, &guard).await?;
    assert_eq!(tags["sys-01"].len(), 2);
    assert_eq!(tags["sys-01"][0].key, "env");
    assert_eq!(tags["sys-03"][0].value.as_deref(), Some("dev"));
    assert!(!tags.contains_key("sys-00"));

    db.close().await;
    Ok(())
}

#[tokio::test]
async fn zero_limit_counts_without_rows() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, conn) = seeded(&dir).await?;

    let page = list(&conn, "limit=0").await?;
    assert!(page.items.is_empty());
    assert_eq!(page.meta.total_items, 23);

    db.close().await;
    Ok(())
}
