use async_trait::async_trait;
use listing_core::{ListPage, ListPlan};

use crate::domain::model::{AdvisoryRow, PackageRow, SystemExportRow, SystemRow};

/// Port for the domain layer: tenant-scoped listing queries.
///
/// Every method receives an already validated plan; implementations only
/// compile and execute it.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn list_systems(&self, account: &str, plan: &ListPlan)
        -> anyhow::Result<ListPage<SystemRow>>;
    async fn export_systems(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<SystemExportRow>>;

    /// True when an advisory with this name exists.
    async fn advisory_exists(&self, name: &str) -> anyhow::Result<bool>;
    async fn list_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<SystemRow>>;
    async fn export_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<Vec<SystemExportRow>>;

    async fn list_advisories(
        &self,
        account: &str,
        plan: &ListPlan,
    ) -> anyhow::Result<ListPage<AdvisoryRow>>;
    async fn export_advisories(&self, account: &str, plan: &ListPlan)
        -> anyhow::Result<Vec<AdvisoryRow>>;

    async fn list_packages(&self, account: &str, plan: &ListPlan)
        -> anyhow::Result<ListPage<PackageRow>>;
    async fn export_packages(&self, account: &str, plan: &ListPlan)
        -> anyhow::Result<Vec<PackageRow>>;
}
