use std::sync::Arc;

use axum::Router;
use listing_db::{DbHandle, ExecGuard};
use sea_orm::ConnectionTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::InventoryConfig;
use crate::domain::registry::Catalog;
use crate::domain::service::Service;
use crate::infra::storage::SeaOrmInventoryRepository;

/// Inventory listings: catalog, repository and service wired together.
#[derive(Clone)]
pub struct Inventory {
    service: Arc<Service>,
    api_prefix: String,
}

impl Inventory {
    pub const NAME: &'static str = "inventory";

    /// Wire the module over the shared database handle.
    pub fn init(db: &DbHandle, cfg: InventoryConfig, guard: ExecGuard) -> anyhow::Result<Self> {
        info!("Initializing inventory module");
        Self::with_connection(db.sea(), cfg, guard)
    }

    /// Wire the module over any SeaORM connection.
    pub fn with_connection<C>(conn: C, cfg: InventoryConfig, guard: ExecGuard) -> anyhow::Result<Self>
    where
        C: ConnectionTrait + Send + Sync + 'static,
    {
        debug!(
            default_limit = cfg.default_limit,
            max_limit = cfg.max_limit,
            allow_unbounded_list = cfg.allow_unbounded_list,
            "Loaded inventory config"
        );

        let catalog = Arc::new(Catalog::new(&cfg)?);
        let repo = SeaOrmInventoryRepository::new(conn, catalog.clone(), guard);
        let service = Service::new(Arc::new(repo), catalog);

        Ok(Self {
            service: Arc::new(service),
            api_prefix: cfg.api_prefix,
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    pub fn register_rest(&self, router: Router) -> Router {
        info!(prefix = %self.api_prefix, "Registering inventory REST routes");
        routes::register_routes(router, &self.api_prefix, self.service.clone())
    }
}
