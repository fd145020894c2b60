//! SQL side of the listing engine.
//!
//! Takes a validated `listing_core::ListPlan` and a tenant-scoped base
//! `SelectStatement`, compiles the plan into predicates, and runs the
//! count/page or export queries through SeaORM.
//!
//! ```rust,no_run
//! # async fn demo() -> listing_db::Result<()> {
//! use listing_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite://patch.db?mode=rwc", ConnectOpts::default()).await?;
//! let conn = db.sea();
//! # let _ = conn;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

pub mod exec;
pub mod handle;
pub mod query;
pub mod tags;

pub use exec::ExecGuard;
pub use handle::{redact_credentials_in_dsn, ConnectOpts, DbEngine, DbHandle};
pub use query::{apply_all, ListQuery, Predicate};
pub use tags::{load_tags, Tag, TagJoin, TagSource};

use std::time::Duration;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("query cancelled")]
    Cancelled,

    #[error("plan cannot be compiled: {0}")]
    InvalidPlan(String),
}
