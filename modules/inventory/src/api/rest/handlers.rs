use std::sync::Arc;

use apikit::{list_error_to_problem, render_export, render_list, ListRequest, ProblemResponse};
use axum::extract::Path;
use axum::response::Response;
use axum::Extension;
use listing_core::{build_links, ListOpts, ListPage};
use serde::Serialize;
use tracing::info;

use crate::api::rest::error::map_domain_error;
use crate::api::rest::identity::AccountId;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

fn respond_list<T: Serialize>(
    req: &ListRequest,
    opts: &ListOpts,
    page: ListPage<T>,
) -> Result<Response, ProblemResponse> {
    let links = build_links(&req.path, req.raw_query.as_deref(), &page.meta);
    render_list(req.format, &opts.registry, page, links)
        .map_err(|e| list_error_to_problem(&e, &req.path))
}

/// Export rows carry the tag column where the endpoint supports tags.
fn respond_export<T: Serialize>(
    req: &ListRequest,
    opts: &ListOpts,
    rows: Vec<T>,
) -> Result<Response, ProblemResponse> {
    let columns = opts.registry.output_columns(opts.tags_enabled);
    render_export(req.format, &columns, rows).map_err(|e| list_error_to_problem(&e, &req.path))
}

fn fail(req: &ListRequest) -> impl Fn(DomainError) -> ProblemResponse + '_ {
    move |e| map_domain_error(&e, &req.path)
}

pub async fn list_systems(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, query = ?req.raw_query, "Listing systems");
    let page = svc
        .list_systems(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_list(&req, &svc.catalog().systems, page)
}

pub async fn export_systems(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, format = ?req.format, "Exporting systems");
    let rows = svc
        .export_systems(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_export(&req, &svc.catalog().systems_export, rows)
}

pub async fn list_advisory_systems(
    Extension(svc): Extension<Arc<Service>>,
    Path(advisory_id): Path<String>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, advisory = %advisory_id, "Listing advisory systems");
    let page = svc
        .list_advisory_systems(&account.0, &advisory_id, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_list(&req, &svc.catalog().advisory_systems, page)
}

pub async fn export_advisory_systems(
    Extension(svc): Extension<Arc<Service>>,
    Path(advisory_id): Path<String>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, advisory = %advisory_id, format = ?req.format, "Exporting advisory systems");
    let rows = svc
        .export_advisory_systems(&account.0, &advisory_id, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_export(&req, &svc.catalog().advisory_systems_export, rows)
}

pub async fn list_advisories(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, query = ?req.raw_query, "Listing advisories");
    let page = svc
        .list_advisories(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_list(&req, &svc.catalog().advisories, page)
}

pub async fn export_advisories(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, format = ?req.format, "Exporting advisories");
    let rows = svc
        .export_advisories(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_export(&req, &svc.catalog().advisories_export, rows)
}

pub async fn list_packages(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, query = ?req.raw_query, "Listing packages");
    let page = svc
        .list_packages(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_list(&req, &svc.catalog().packages, page)
}

pub async fn export_packages(
    Extension(svc): Extension<Arc<Service>>,
    account: AccountId,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    info!(account = %account.0, format = ?req.format, "Exporting packages");
    let rows = svc
        .export_packages(&account.0, &req.params)
        .await
        .map_err(fail(&req))?;
    respond_export(&req, &svc.catalog().packages_export, rows)
}
