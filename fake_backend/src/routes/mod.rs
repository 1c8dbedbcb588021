//! HTTP surface of the fake backend, mounted under `/api`.
//!
//! - `/token/`, `/token/refresh/` → public
//! - everything else → requires a valid access token

use crate::auth::require_access;
use crate::state::{Collection, Data, FakeBackend, Record};
use axum::{
    Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

pub mod classes;
pub mod crud;
pub mod instructors;
pub mod results;
pub mod token;

pub fn routes(backend: FakeBackend) -> Router {
    let protected = Router::new()
        .merge(crud::crud_routes(Collection::Students))
        .merge(crud::crud_routes(Collection::Courses))
        .merge(crud::crud_routes(Collection::Subjects))
        .merge(instructors::instructor_routes())
        .merge(classes::class_routes())
        .merge(results::result_routes())
        .route_layer(from_fn_with_state(backend.clone(), require_access));

    let api = Router::new()
        .merge(token::token_routes())
        .merge(protected)
        .with_state(backend);

    Router::new().nest("/api", api)
}

pub(crate) fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
}

pub(crate) fn bad_request(body: Value) -> Response {
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// `{"field": ["msg"], ...}` in the order given.
pub(crate) fn field_errors(errors: Vec<(String, String)>) -> Response {
    let mut body = serde_json::Map::new();
    for (field, message) in errors {
        let entry = body.entry(field).or_insert_with(|| json!([]));
        if let Value::Array(messages) = entry {
            messages.push(json!(message));
        }
    }
    bad_request(Value::Object(body))
}

/// Accepts `7` as well as `"7"`.
pub(crate) fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn id_field(record: &Record, field: &str) -> Option<i64> {
    record.get(field).and_then(as_id)
}

/// Shapes a stored record the way the real backend serializes it.
///
/// Classes embed their students; marks are decimal strings.
pub(crate) fn render(data: &Data, collection: Collection, record: &Record) -> Value {
    let mut out = record.clone();
    match collection {
        Collection::Classes => {
            let students: Vec<Value> = record
                .get("students")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(as_id)
                        .map(|id| match data.get(Collection::Students, id) {
                            Some(s) => json!({
                                "id": id,
                                "first_name": s.get("first_name"),
                                "last_name": s.get("last_name"),
                                "id_number": s.get("id_number"),
                            }),
                            None => json!({ "id": id }),
                        })
                        .collect()
                })
                .unwrap_or_default();
            out.insert("students".into(), Value::Array(students));
        }
        Collection::SubjectResults => {
            for field in ["theory_marks", "practical_marks", "total_marks"] {
                if let Some(mark) = record.get(field).and_then(Value::as_f64) {
                    out.insert(field.into(), json!(format!("{mark:.2}")));
                }
            }
        }
        _ => {}
    }
    Value::Object(out)
}
