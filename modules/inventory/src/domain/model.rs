//! Row shapes produced by the listing queries.
//!
//! Field names equal the registry API names, which are also the SQL aliases
//! the projection selects into.

use chrono::{DateTime, Utc};
use listing_db::Tag;
use sea_orm::FromQueryResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct SystemRow {
    pub id: String,
    pub display_name: String,
    pub last_evaluation: Option<DateTime<Utc>>,
    pub last_upload: Option<DateTime<Utc>>,
    pub rhsa_count: i64,
    pub rhba_count: i64,
    pub rhea_count: i64,
    pub packages_installed: i64,
    pub packages_updatable: i64,
    pub enabled: bool,
    pub stale: bool,
}

/// Export row: the list attributes plus the system's tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemExportRow {
    #[serde(flatten)]
    pub system: SystemRow,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct AdvisoryRow {
    pub id: String,
    pub synopsis: String,
    pub description: Option<String>,
    pub advisory_type: String,
    pub public_date: Option<DateTime<Utc>>,
    pub severity: Option<i64>,
    pub cvss_score: Option<f64>,
    pub applicable_systems: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct PackageRow {
    pub name: String,
    pub summary: Option<String>,
    pub systems_installed: i64,
    pub systems_updatable: i64,
}
