#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use inventory::api::rest::identity::trusted_account_header;
use inventory::{Inventory, InventoryConfig, ACCOUNT_HEADER};
use listing_db::{ConnectOpts, DbHandle, ExecGuard};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PREFIX: &str = "/api/patch/v1";

const SCHEMA: &[&str] = &[
    "CREATE TABLE rh_account (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)",
    "CREATE TABLE system_platform (
        id INTEGER PRIMARY KEY,
        inventory_id TEXT NOT NULL UNIQUE,
        rh_account_id INTEGER NOT NULL REFERENCES rh_account (id),
        display_name TEXT NOT NULL,
        last_evaluation TIMESTAMP,
        last_upload TIMESTAMP,
        advisory_sec_count_cache INTEGER NOT NULL DEFAULT 0,
        advisory_bug_count_cache INTEGER NOT NULL DEFAULT 0,
        advisory_enh_count_cache INTEGER NOT NULL DEFAULT 0,
        packages_installed INTEGER NOT NULL DEFAULT 0,
        packages_updatable INTEGER NOT NULL DEFAULT 0,
        opt_out BOOLEAN NOT NULL DEFAULT 0,
        stale BOOLEAN NOT NULL DEFAULT 0,
        system_profile TEXT
    )",
    "CREATE TABLE system_tags (
        inventory_id TEXT NOT NULL,
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT
    )",
    "CREATE TABLE advisory_type (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE advisory_metadata (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        synopsis TEXT NOT NULL,
        description TEXT,
        advisory_type_id INTEGER REFERENCES advisory_type (id),
        public_date TIMESTAMP,
        severity_id INTEGER,
        cvss_score REAL
    )",
    "CREATE TABLE advisory_account_data (
        advisory_id INTEGER NOT NULL,
        rh_account_id INTEGER NOT NULL,
        systems_affected INTEGER
    )",
    "CREATE TABLE system_advisories (
        rh_account_id INTEGER NOT NULL,
        system_id INTEGER NOT NULL,
        advisory_id INTEGER NOT NULL
    )",
    "CREATE TABLE package_name (id INTEGER PRIMARY KEY, name TEXT NOT NULL, summary TEXT)",
    "CREATE TABLE package_account_data (
        package_name_id INTEGER NOT NULL,
        rh_account_id INTEGER NOT NULL,
        systems_installed INTEGER,
        systems_updatable INTEGER
    )",
];

pub fn inventory_id(i: u32) -> String {
    format!("00000000-0000-0000-0000-{i:012}")
}

/// acct-1 owns systems 1..=12 (11 and 12 stale, 3 opted out);
/// acct-2 owns system 13.
async fn seed(conn: &DatabaseConnection) -> Result<()> {
    for ddl in SCHEMA {
        conn.execute_unprepared(ddl).await?;
    }

    conn.execute_unprepared("INSERT INTO rh_account VALUES (1, 'acct-1'), (2, 'acct-2')")
        .await?;

    for i in 1..=13u32 {
        let account = if i == 13 { 2 } else { 1 };
        conn.execute_unprepared(&format!(
            "INSERT INTO system_platform
                (id, inventory_id, rh_account_id, display_name, last_evaluation, last_upload,
                 advisory_sec_count_cache, advisory_bug_count_cache, advisory_enh_count_cache,
                 packages_installed, packages_updatable, opt_out, stale, system_profile)
             VALUES ({i}, '{id}', {account}, 'host-{i:02}.example.com',
                 '2024-02-{i:02}T08:00:00Z', '2024-01-{i:02}T10:00:00Z',
                 {sec}, {bug}, 1, {inst}, {upd}, {opt_out}, {stale}, '{{}}')",
            id = inventory_id(i),
            sec = i % 4,
            bug = i % 2,
            inst = i * 10,
            upd = i % 3,
            opt_out = u8::from(i == 3),
            stale = u8::from(i == 11 || i == 12),
        ))
        .await?;
    }

    conn.execute_unprepared(&format!(
        "INSERT INTO system_tags VALUES
            ('{s1}', 'insights-client', 'env', 'prod'),
            ('{s1}', 'insights-client', 'region', 'us'),
            ('{s2}', 'insights-client', 'env', 'prod'),
            ('{s3}', 'insights-client', 'region', 'us'),
            ('{s13}', 'insights-client', 'env', 'prod'),
            ('{s13}', 'insights-client', 'region', 'us')",
        s1 = inventory_id(1),
        s2 = inventory_id(2),
        s3 = inventory_id(3),
        s13 = inventory_id(13),
    ))
    .await?;

    conn.execute_unprepared(
        "INSERT INTO advisory_type VALUES (1, 'security'), (2, 'bugfix'), (3, 'enhancement')",
    )
    .await?;
    conn.execute_unprepared(
        "INSERT INTO advisory_metadata VALUES
            (1, 'RHSA-2024:0001', 'Important: kernel security update', 'kernel fixes', 1,
                '2024-02-01T00:00:00Z', 3, 7.5),
            (2, 'RHBA-2024:0002', 'bash bug fix update', NULL, 2,
                '2024-03-01T00:00:00Z', NULL, NULL),
            (3, 'RHEA-2024:0003', 'openssl enhancement update', NULL, 3,
                '2024-01-15T00:00:00Z', NULL, NULL),
            (4, 'RHSA-2024:0004', 'Moderate: glibc security update', NULL, 1,
                '2024-04-01T00:00:00Z', 2, 5.3)",
    )
    .await?;
    conn.execute_unprepared(
        "INSERT INTO advisory_account_data VALUES (1, 1, 3), (2, 1, 1), (3, 1, NULL), (4, 2, 1)",
    )
    .await?;
    conn.execute_unprepared(
        "INSERT INTO system_advisories VALUES (1, 1, 1), (1, 2, 1), (1, 11, 1), (1, 4, 2), (2, 13, 4)",
    )
    .await?;

    conn.execute_unprepared(
        "INSERT INTO package_name VALUES
            (1, 'kernel', 'The Linux kernel'),
            (2, 'bash', 'The GNU Bourne Again shell'),
            (3, 'openssl', NULL)",
    )
    .await?;
    conn.execute_unprepared(
        "INSERT INTO package_account_data VALUES (1, 1, 10, 2), (2, 1, 8, NULL), (3, 2, 1, 1)",
    )
    .await?;

    Ok(())
}

/// Seeded SQLite file plus the router under test. Keep the guard alive.
pub struct Fixture {
    pub dir: TempDir,
    pub db: DbHandle,
    pub app: Router,
}

pub async fn fixture() -> Result<Fixture> {
    fixture_with(InventoryConfig::default()).await
}

pub async fn fixture_with(cfg: InventoryConfig) -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("patch.db").display());
    let db = DbHandle::connect(&dsn, ConnectOpts::default()).await?;
    seed(&db.sea()).await?;

    let inventory = Inventory::init(&db, cfg, ExecGuard::unbounded())?;
    let app = inventory
        .register_rest(Router::new())
        .layer(axum::middleware::from_fn(trusted_account_header));

    Ok(Fixture { dir, db, app })
}

pub struct Reply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("JSON body")
    }
}

pub async fn get(app: &Router, uri: &str, account: Option<&str>, accept: Option<&str>) -> Reply {
    let mut req = Request::builder().uri(uri);
    if let Some(a) = account {
        req = req.header(ACCOUNT_HEADER, a);
    }
    if let Some(a) = accept {
        req = req.header(header::ACCEPT, a);
    }
    let resp = app
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    Reply {
        status,
        content_type,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

/// GET as acct-1 with JSON.
pub async fn get_json(app: &Router, path_and_query: &str) -> Reply {
    get(
        app,
        &format!("{PREFIX}{path_and_query}"),
        Some("acct-1"),
        Some("application/json"),
    )
    .await
}
