use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{DbError, Result};

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Pool knobs applied on connect.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Emit sqlx statement logs.
    pub sql_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            sql_logging: false,
        }
    }
}

/// Main handle.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    dsn: String,
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(redact_credentials_in_dsn(Some(dsn))))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;

        let mut o = ConnectOptions::new(dsn.to_string());
        if let Some(n) = opts.max_conns {
            o.max_connections(n);
        }
        if let Some(n) = opts.min_conns {
            o.min_connections(n);
        }
        if let Some(t) = opts.acquire_timeout {
            o.acquire_timeout(t);
        }
        if let Some(t) = opts.idle_timeout {
            o.idle_timeout(t);
        }
        o.sqlx_logging(opts.sql_logging);

        let sea = Database::connect(o).await?;
        tracing::info!(
            engine = ?engine,
            dsn = %redact_credentials_in_dsn(Some(dsn)),
            "database connected"
        );

        Ok(Self {
            engine,
            dsn: dsn.to_string(),
            sea,
        })
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN with the password masked.
    pub fn dsn(&self) -> String {
        redact_credentials_in_dsn(Some(&self.dsn))
    }

    /// SeaORM connection (internally pooled, cheap to clone).
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    pub async fn close(self) {
        if let Err(e) = self.sea.close().await {
            tracing::warn!(error = %e, "error while closing database pool");
        }
    }
}

pub fn redact_credentials_in_dsn(dsn: Option<&str>) -> String {
    match dsn {
        Some(dsn) if dsn.contains('@') => {
            if let Ok(mut parsed) = url::Url::parse(dsn) {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            } else {
                "***".to_string()
            }
        }
        Some(dsn) => dsn.to_string(),
        None => "none".to_string(),
    }
}
