use std::sync::Arc;

use listing_core::{ListPage, ListPlan, RawListParams};
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::domain::model::{AdvisoryRow, PackageRow, SystemExportRow, SystemRow};
use crate::domain::registry::Catalog;
use crate::domain::repo::InventoryRepository;

/// Validates listing requests against the catalog, then delegates to the
/// repository. A request that fails validation never reaches the database.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn InventoryRepository>,
    catalog: Arc<Catalog>,
}

fn db_error(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    pub fn new(repo: Arc<dyn InventoryRepository>, catalog: Arc<Catalog>) -> Self {
        Self { repo, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[instrument(name = "inventory.service.list_systems", skip(self, params), fields(account = %account))]
    pub async fn list_systems(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<ListPage<SystemRow>, DomainError> {
        let plan = ListPlan::list(&self.catalog.systems, params)?;
        let page = self
            .repo
            .list_systems(account, &plan)
            .await
            .map_err(db_error)?;
        debug!(total = page.meta.total_items, rows = page.items.len(), "listed systems");
        Ok(page)
    }

    #[instrument(name = "inventory.service.export_systems", skip(self, params), fields(account = %account))]
    pub async fn export_systems(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<Vec<SystemExportRow>, DomainError> {
        let plan = ListPlan::export(&self.catalog.systems_export, params)?;
        let rows = self
            .repo
            .export_systems(account, &plan)
            .await
            .map_err(db_error)?;
        debug!(rows = rows.len(), "exported systems");
        Ok(rows)
    }

    async fn ensure_advisory(&self, advisory: &str) -> Result<(), DomainError> {
        let exists = self
            .repo
            .advisory_exists(advisory)
            .await
            .map_err(db_error)?;
        if exists {
            Ok(())
        } else {
            Err(DomainError::advisory_not_found(advisory))
        }
    }

    #[instrument(
        name = "inventory.service.list_advisory_systems",
        skip(self, params),
        fields(account = %account, advisory = %advisory)
    )]
    pub async fn list_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        params: &RawListParams,
    ) -> Result<ListPage<SystemRow>, DomainError> {
        let plan = ListPlan::list(&self.catalog.advisory_systems, params)?;
        self.ensure_advisory(advisory).await?;
        self.repo
            .list_advisory_systems(account, advisory, &plan)
            .await
            .map_err(db_error)
    }

    #[instrument(
        name = "inventory.service.export_advisory_systems",
        skip(self, params),
        fields(account = %account, advisory = %advisory)
    )]
    pub async fn export_advisory_systems(
        &self,
        account: &str,
        advisory: &str,
        params: &RawListParams,
    ) -> Result<Vec<SystemExportRow>, DomainError> {
        let plan = ListPlan::export(&self.catalog.advisory_systems_export, params)?;
        self.ensure_advisory(advisory).await?;
        self.repo
            .export_advisory_systems(account, advisory, &plan)
            .await
            .map_err(db_error)
    }

    #[instrument(name = "inventory.service.list_advisories", skip(self, params), fields(account = %account))]
    pub async fn list_advisories(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<ListPage<AdvisoryRow>, DomainError> {
        let plan = ListPlan::list(&self.catalog.advisories, params)?;
        self.repo
            .list_advisories(account, &plan)
            .await
            .map_err(db_error)
    }

    #[instrument(name = "inventory.service.export_advisories", skip(self, params), fields(account = %account))]
    pub async fn export_advisories(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<Vec<AdvisoryRow>, DomainError> {
        let plan = ListPlan::export(&self.catalog.advisories_export, params)?;
        self.repo
            .export_advisories(account, &plan)
            .await
            .map_err(db_error)
    }

    #[instrument(name = "inventory.service.list_packages", skip(self, params), fields(account = %account))]
    pub async fn list_packages(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<ListPage<PackageRow>, DomainError> {
        let plan = ListPlan::list(&self.catalog.packages, params)?;
        self.repo
            .list_packages(account, &plan)
            .await
            .map_err(db_error)
    }

    #[instrument(name = "inventory.service.export_packages", skip(self, params), fields(account = %account))]
    pub async fn export_packages(
        &self,
        account: &str,
        params: &RawListParams,
    ) -> Result<Vec<PackageRow>, DomainError> {
        let plan = ListPlan::export(&self.catalog.packages_export, params)?;
        self.repo
            .export_packages(account, &plan)
            .await
            .map_err(db_error)
    }
}
