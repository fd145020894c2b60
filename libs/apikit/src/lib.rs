//! HTTP boundary for listing endpoints: problem documents, request
//! extraction, content negotiation and JSON/CSV rendering.

pub mod error;
pub mod extract;
pub mod negotiate;
pub mod problem;
pub mod render;

pub use error::{error_code, list_error_to_problem};
pub use extract::ListRequest;
pub use negotiate::ResponseFormat;
pub use problem::{
    from_parts, request_id_scope, Problem, ProblemResponse, APPLICATION_PROBLEM_JSON,
    REQUEST_ID_HEADER,
};
pub use render::{csv_body, envelope, render_export, render_list, ListEnvelope, ListItem};
