//! A listing endpoint over in-memory rows, driven through the axum router.

use std::sync::Arc;

use apikit::{
    list_error_to_problem, render_list, request_id_scope, ListRequest, ProblemResponse,
    REQUEST_ID_HEADER,
};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Extension, Router};
use listing_core::{
    build_links, build_meta, FieldDescriptor, FieldKind, ListOpts, ListPage, ListPlan, Registry,
};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

#[derive(Clone, Serialize)]
struct Advisory {
    id: String,
    synopsis: String,
    cvss_score: Option<f64>,
}

fn opts() -> Arc<ListOpts> {
    let registry = Registry::builder("advisory", "id")
        .field(FieldDescriptor::column("id", "am.name", FieldKind::String))
        .field(FieldDescriptor::column("synopsis", "am.synopsis", FieldKind::String))
        .field(FieldDescriptor::column("cvss_score", "am.cvss_score", FieldKind::F64))
        .build()
        .unwrap();
    Arc::new(ListOpts::new(Arc::new(registry)).build().unwrap())
}

fn rows() -> Vec<Advisory> {
    (1..=3)
        .map(|i| Advisory {
            id: format!("RHSA-2024:{i}"),
            synopsis: format!("Important: fix {i}"),
            cvss_score: (i != 2).then(|| 5.5 + i as f64),
        })
        .collect()
}

async fn list(
    Extension(opts): Extension<Arc<ListOpts>>,
    req: ListRequest,
) -> Result<Response, ProblemResponse> {
    let fail = |e| list_error_to_problem(&e, &req.path);
    let plan = ListPlan::list(&opts, &req.params).map_err(fail)?;
    let page = plan.page.expect("list plan carries a page");

    let all = rows();
    let items: Vec<_> = all
        .iter()
        .skip(page.sql_offset() as usize)
        .take(page.sql_limit().map_or(usize::MAX, |l| l as usize))
        .cloned()
        .collect();
    let page = ListPage::new(items, build_meta(all.len() as u64, page));
    let links = build_links(&req.path, req.raw_query.as_deref(), &page.meta);
    render_list(req.format, &opts.registry, page, links).map_err(fail)
}

fn app() -> Router {
    Router::new()
        .route("/advisories", get(list))
        .layer(Extension(opts()))
        .layer(middleware::from_fn(request_id_scope))
}

async fn call(uri: &str, accept: Option<&str>) -> (StatusCode, String, String) {
    let mut req = Request::builder().uri(uri);
    if let Some(a) = accept {
        req = req.header(header::ACCEPT, a);
    }
    let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, ct, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn json_envelope_with_links() {
    let (status, ct, body) = call("/advisories?limit=2", Some("application/json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "application/json");

    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["data"].as_array().unwrap().len(), 2);
    assert_eq!(v["data"][0]["id"], "RHSA-2024:1");
    assert_eq!(v["data"][0]["type"], "advisory");
    assert_eq!(v["meta"]["total_items"], 3);
    assert_eq!(v["links"]["next"], "/advisories?limit=2&offset=2");
    assert!(v["links"]["previous"].is_null());
}

#[tokio::test]
async fn csv_carries_the_same_values_as_json() {
    let (_, _, json) = call("/advisories", Some("application/json")).await;
    let (status, ct, csv) = call("/advisories", Some("text/csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "text/csv");

    let v: Value = serde_json::from_str(&json).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("id,synopsis,cvss_score"));
    for (item, line) in v["data"].as_array().unwrap().iter().zip(lines) {
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells[0], item["id"].as_str().unwrap());
        assert_eq!(cells[1], item["attributes"]["synopsis"].as_str().unwrap());
        match item["attributes"]["cvss_score"].as_f64() {
            Some(score) => assert_eq!(cells[2].parse::<f64>().unwrap(), score),
            None => assert_eq!(cells[2], ""),
        }
    }
}

#[tokio::test]
async fn unknown_filter_is_a_400_problem() {
    let (status, ct, body) = call("/advisories?filter%5Bnonexistent%5D=x", Some("application/json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ct, "application/problem+json");
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["code"], "UNKNOWN_FILTER_FIELD");
    assert_eq!(v["instance"], "/advisories");
}

#[tokio::test]
async fn xml_accept_is_a_415_problem() {
    let (status, _, body) = call("/advisories", Some("text/xml")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body.contains("application/json"));
    assert!(body.contains("text/csv"));
}

#[tokio::test]
async fn missing_or_wildcard_accept_is_a_415_problem() {
    for accept in [None, Some("*/*"), Some("application/*")] {
        let (status, ct, _) = call("/advisories", accept).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE, "{accept:?}");
        assert_eq!(ct, "application/problem+json");
    }
}

#[tokio::test]
async fn problem_echoes_request_id() {
    let req = Request::builder()
        .uri("/advisories?sort=nonexistent")
        .header(header::ACCEPT, "application/json")
        .header(REQUEST_ID_HEADER, "4f1c2a")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["request_id"], "4f1c2a");

    let (_, _, body) = call("/advisories?sort=nonexistent", Some("application/json")).await;
    let v: Value = serde_json::from_str(&body).unwrap();
    assert!(v.get("request_id").is_none());
}
