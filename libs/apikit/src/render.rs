//! JSON/CSV rendering of list pages and exports.
//!
//! Both formats are produced from the same per-row `serde_json` values, so a
//! CSV cell always carries what the JSON attribute carries.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use listing_core::{Links, ListError, ListPage, PageMeta, Registry};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::negotiate::{ResponseFormat, TEXT_CSV};

#[derive(Debug, Serialize)]
pub struct ListItem {
    pub id: Value,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: Map<String, Value>,
}

/// `{data, meta, links}` body of a list response.
#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub data: Vec<ListItem>,
    pub meta: PageMeta,
    pub links: Links,
}

fn to_object<T: Serialize>(row: T) -> Result<Map<String, Value>, ListError> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ListError::Serialization(format!(
            "row must serialize to an object, got {other}"
        ))),
        Err(e) => Err(ListError::Serialization(e.to_string())),
    }
}

/// Split each row into `{id, type, attributes}` using the registry's primary field.
pub fn envelope<T: Serialize>(
    registry: &Registry,
    page: ListPage<T>,
    links: Links,
) -> Result<ListEnvelope, ListError> {
    let data = page
        .items
        .into_iter()
        .map(|row| {
            let mut attributes = to_object(row)?;
            let id = attributes.remove(registry.primary()).unwrap_or(Value::Null);
            Ok(ListItem {
                id,
                kind: registry.entity(),
                attributes,
            })
        })
        .collect::<Result<Vec<_>, ListError>>()?;

    Ok(ListEnvelope {
        data,
        meta: page.meta,
        links,
    })
}

fn cell(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Header row of `columns`, then one record per row in the same order.
pub fn csv_body<T: Serialize>(columns: &[&str], rows: Vec<T>) -> Result<String, ListError> {
    let ser = |e: csv::Error| ListError::Serialization(e.to_string());

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(columns).map_err(ser)?;
    for row in rows {
        let obj = to_object(row)?;
        wtr.write_record(columns.iter().map(|c| cell(obj.get(*c))))
            .map_err(ser)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ListError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ListError::Serialization(e.to_string()))
}

fn csv_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, TEXT_CSV)], body).into_response()
}

/// List page: JSON envelope, or flat CSV of the registry's output columns.
pub fn render_list<T: Serialize>(
    format: ResponseFormat,
    registry: &Registry,
    page: ListPage<T>,
    links: Links,
) -> Result<Response, ListError> {
    match format {
        ResponseFormat::Json => Ok(Json(envelope(registry, page, links)?).into_response()),
        ResponseFormat::Csv => {
            let columns = registry.output_columns(false);
            Ok(csv_response(csv_body(&columns, page.items)?))
        }
    }
}

/// Export: bare JSON array of rows, or CSV with `columns` as header.
pub fn render_export<T: Serialize>(
    format: ResponseFormat,
    columns: &[&str],
    rows: Vec<T>,
) -> Result<Response, ListError> {
    match format {
        ResponseFormat::Json => Ok(Json(rows).into_response()),
        ResponseFormat::Csv => Ok(csv_response(csv_body(columns, rows)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_core::{build_meta, FieldDescriptor, FieldKind, PageRequest};

    #[derive(Serialize)]
    struct Pkg {
        name: String,
        summary: Option<String>,
        systems_installed: i64,
    }

    fn registry() -> Registry {
        Registry::builder("package", "name")
            .field(FieldDescriptor::column("name", "pn.name", FieldKind::String))
            .field(FieldDescriptor::column("summary", "pn.summary", FieldKind::String))
            .field(FieldDescriptor::column(
                "systems_installed",
                "pad.systems_installed",
                FieldKind::I64,
            ))
            .build()
            .unwrap()
    }

    fn rows() -> Vec<Pkg> {
        vec![
            Pkg {
                name: "kernel".into(),
                summary: Some("The Linux kernel, core".into()),
                systems_installed: 3,
            },
            Pkg {
                name: "bash".into(),
                summary: None,
                systems_installed: 0,
            },
        ]
    }

    #[test]
    fn envelope_moves_primary_into_id() {
        let page = ListPage::new(rows(), build_meta(2, PageRequest::new(20, 0)));
        let links = listing_core::build_links("/packages", None, &page.meta);
        let env = envelope(&registry(), page, links).unwrap();
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["data"][0]["id"], "kernel");
        assert_eq!(v["data"][0]["type"], "package");
        assert_eq!(v["data"][0]["attributes"]["systems_installed"], 3);
        assert!(v["data"][0]["attributes"].get("name").is_none());
        assert_eq!(v["meta"]["total_items"], 2);
        assert!(v["links"]["next"].is_null());
    }

    #[test]
    fn csv_quotes_and_blanks_missing_values() {
        let body = csv_body(&["name", "summary", "systems_installed"], rows()).unwrap();
        assert_eq!(
            body,
            "name,summary,systems_installed\n\
             kernel,\"The Linux kernel, core\",3\n\
             bash,,0\n"
        );
    }

    #[test]
    fn nested_values_render_as_compact_json() {
        #[derive(Serialize)]
        struct Row {
            id: &'static str,
            tags: Vec<(&'static str, &'static str)>,
        }
        let body = csv_body(
            &["id", "tags"],
            vec![Row {
                id: "a",
                tags: vec![("env", "prod")],
            }],
        )
        .unwrap();
        assert_eq!(body, "id,tags\na,\"[[\"\"env\"\",\"\"prod\"\"]]\"\n");
    }

    #[test]
    fn csv_response_sets_content_type() {
        let resp = render_export(ResponseFormat::Csv, &["name"], rows()).unwrap();
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            TEXT_CSV
        );
    }

    #[test]
    fn non_object_rows_are_serialization_errors() {
        let err = csv_body(&["x"], vec![1u8]).unwrap_err();
        assert!(matches!(err, ListError::Serialization(_)));
    }
}
