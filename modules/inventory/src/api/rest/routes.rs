use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount every inventory route under `prefix`.
pub fn register_routes(router: Router, prefix: &str, service: Arc<Service>) -> Router {
    let p = prefix.trim_end_matches('/');

    let routes = Router::new()
        .route(&format!("{p}/systems"), get(handlers::list_systems))
        .route(&format!("{p}/export/systems"), get(handlers::export_systems))
        .route(&format!("{p}/advisories"), get(handlers::list_advisories))
        .route(&format!("{p}/export/advisories"), get(handlers::export_advisories))
        .route(
            &format!("{p}/advisories/{{advisory_id}}/systems"),
            get(handlers::list_advisory_systems),
        )
        .route(
            &format!("{p}/export/advisories/{{advisory_id}}/systems"),
            get(handlers::export_advisory_systems),
        )
        .route(&format!("{p}/packages"), get(handlers::list_packages))
        .route(&format!("{p}/export/packages"), get(handlers::export_packages))
        .layer(Extension(service));

    router.merge(routes)
}
