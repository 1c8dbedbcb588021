use super::{as_id, bad_request, crud, field_errors, id_field, not_found, render};
use crate::state::{Collection, Data, FakeBackend};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::Ordering;

#[derive(Deserialize)]
struct ResultKey {
    student: Option<Value>,
    class_instance: Option<Value>,
}

pub fn result_routes() -> Router<FakeBackend> {
    Router::new()
        .route("/results/", get(list_results).post(create_result))
        .route("/results/get_or_create/", post(get_or_create))
        .route("/results/{id}/", get(retrieve_result).delete(delete_result))
        .route("/subject-results/", get(list_subject_results))
        .route(
            "/subject-results/{id}/",
            get(retrieve_subject_result).patch(patch_subject_result),
        )
}

async fn list_results(
    State(backend): State<FakeBackend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    crud::list(&backend, Collection::Results, &params)
}

async fn retrieve_result(State(backend): State<FakeBackend>, Path(id): Path<i64>) -> Response {
    crud::retrieve(&backend, Collection::Results, id)
}

async fn delete_result(State(backend): State<FakeBackend>, Path(id): Path<i64>) -> Response {
    let mut data = backend.data();
    if data.remove(Collection::Results, id).is_none() {
        return not_found();
    }
    let orphans: Vec<i64> = data
        .table(Collection::SubjectResults)
        .filter(|r| id_field(r, "result") == Some(id))
        .filter_map(|r| id_field(r, "id"))
        .collect();
    for orphan in orphans {
        data.remove(Collection::SubjectResults, orphan);
    }
    StatusCode::NO_CONTENT.into_response()
}

fn resolve_key(data: &Data, key: &ResultKey) -> Result<(i64, i64), Response> {
    let mut errors = Vec::new();
    let student = key.student.as_ref().and_then(as_id);
    let class_instance = key.class_instance.as_ref().and_then(as_id);

    match student {
        None => errors.push(("student".to_string(), "This field is required.".to_string())),
        Some(id) if data.get(Collection::Students, id).is_none() => errors.push((
            "student".to_string(),
            format!("Invalid pk \"{id}\" - object does not exist."),
        )),
        _ => {}
    }
    match class_instance {
        None => errors.push(("class_instance".to_string(), "This field is required.".to_string())),
        Some(id) if data.get(Collection::Classes, id).is_none() => errors.push((
            "class_instance".to_string(),
            format!("Invalid pk \"{id}\" - object does not exist."),
        )),
        _ => {}
    }

    match (student, class_instance) {
        (Some(s), Some(c)) if errors.is_empty() => Ok((s, c)),
        _ => Err(field_errors(errors)),
    }
}

/// POST /api/results/
async fn create_result(State(backend): State<FakeBackend>, Json(key): Json<ResultKey>) -> Response {
    let mut data = backend.data();
    let (student, class_instance) = match resolve_key(&data, &key) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    if data.find_result(student, class_instance).is_some() {
        return bad_request(json!({
            "non_field_errors": ["The fields student, class_instance must make a unique set."]
        }));
    }

    let record = data.create_result(student, class_instance);
    backend.controls().results_created.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, Json(render(&data, Collection::Results, &record))).into_response()
}

/// POST /api/results/get_or_create/
async fn get_or_create(State(backend): State<FakeBackend>, Json(key): Json<ResultKey>) -> Response {
    if backend.controls().get_or_create_disabled.load(Ordering::SeqCst) {
        return not_found();
    }

    let mut data = backend.data();
    let (student, class_instance) = match resolve_key(&data, &key) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    if let Some(existing) = data.find_result(student, class_instance) {
        return Json(render(&data, Collection::Results, existing)).into_response();
    }

    let record = data.create_result(student, class_instance);
    backend.controls().results_created.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, Json(render(&data, Collection::Results, &record))).into_response()
}

async fn list_subject_results(
    State(backend): State<FakeBackend>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if backend.controls().subject_result_listing_broken.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "A server error occurred." })),
        )
            .into_response();
    }
    crud::list(&backend, Collection::SubjectResults, &params)
}

async fn retrieve_subject_result(State(backend): State<FakeBackend>, Path(id): Path<i64>) -> Response {
    crud::retrieve(&backend, Collection::SubjectResults, id)
}

/// `None` for null or blank, `Some(Err)` for anything unparseable.
fn parse_mark(value: &Value) -> Option<Result<f64, ()>> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().ok_or(())),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().parse::<f64>().map_err(|_| ())),
        _ => Some(Err(())),
    }
}

/// PATCH /api/subject-results/{id}/
///
/// Accepts `theory_marks` / `practical_marks` within the template's maxima
/// and recomputes `total_marks`.
async fn patch_subject_result(
    State(backend): State<FakeBackend>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    backend.controls().patch_calls.fetch_add(1, Ordering::SeqCst);

    let Value::Object(fields) = body else {
        return field_errors(vec![("non_field_errors".into(), "Invalid data.".into())]);
    };

    let mut data = backend.data();
    let Some(row) = data.get(Collection::SubjectResults, id) else {
        return not_found();
    };
    let template = id_field(row, "template").and_then(|t| data.get(Collection::Subjects, t));
    let max_of = |field: &str| {
        template
            .and_then(|t| t.get(field))
            .and_then(Value::as_f64)
            .unwrap_or(100.0)
    };

    let mut updates = Vec::new();
    let mut errors = Vec::new();
    for (field, max_field) in [("theory_marks", "max_theory"), ("practical_marks", "max_practical")] {
        let Some(value) = fields.get(field) else {
            continue;
        };
        match parse_mark(value) {
            None => updates.push((field, Value::Null)),
            Some(Ok(mark)) if mark.is_finite() && (0.0..=max_of(max_field)).contains(&mark) => {
                updates.push((field, json!(mark)))
            }
            Some(Ok(_)) => errors.push((
                field.to_string(),
                format!("Ensure this value is between 0 and {}.", max_of(max_field)),
            )),
            Some(Err(())) => errors.push((field.to_string(), "A valid number is required.".to_string())),
        }
    }
    if !errors.is_empty() {
        return field_errors(errors);
    }

    let Some(row) = data.get_mut(Collection::SubjectResults, id) else {
        return not_found();
    };
    for (field, value) in updates {
        row.insert(field.into(), value);
    }
    let theory = row.get("theory_marks").and_then(Value::as_f64);
    let practical = row.get("practical_marks").and_then(Value::as_f64);
    let total = match (theory, practical) {
        (None, None) => Value::Null,
        (t, p) => json!(t.unwrap_or(0.0) + p.unwrap_or(0.0)),
    };
    row.insert("total_marks".into(), total);

    match data.get(Collection::SubjectResults, id) {
        Some(row) => Json(render(&data, Collection::SubjectResults, row)).into_response(),
        None => not_found(),
    }
}
