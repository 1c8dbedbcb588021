//! Generic list/retrieve/create/update/delete over one collection.

use super::{as_id, field_errors, id_field, not_found, render};
use crate::state::{Collection, Data, FakeBackend, Record};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::collections::HashMap;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 1000;

pub fn crud_routes(collection: Collection) -> Router<FakeBackend> {
    let base = format!("/{}/", collection.path());
    let item = format!("/{}/{{id}}/", collection.path());

    Router::new()
        .route(
            &base,
            get(
                move |State(backend): State<FakeBackend>,
                      Query(params): Query<HashMap<String, String>>| async move {
                    list(&backend, collection, &params)
                },
            )
            .post(
                move |State(backend): State<FakeBackend>, Json(body): Json<Value>| async move {
                    create(&backend, collection, body)
                },
            ),
        )
        .route(
            &item,
            get(
                move |State(backend): State<FakeBackend>, Path(id): Path<i64>| async move {
                    retrieve(&backend, collection, id)
                },
            )
            .patch(
                move |State(backend): State<FakeBackend>,
                      Path(id): Path<i64>,
                      Json(body): Json<Value>| async move {
                    update(&backend, collection, id, body, true)
                },
            )
            .put(
                move |State(backend): State<FakeBackend>,
                      Path(id): Path<i64>,
                      Json(body): Json<Value>| async move {
                    update(&backend, collection, id, body, false)
                },
            )
            .delete(
                move |State(backend): State<FakeBackend>, Path(id): Path<i64>| async move {
                    destroy(&backend, collection, id)
                },
            ),
        )
}

fn filterable(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Subjects => &["course"],
        Collection::Classes => &["course", "instructor"],
        Collection::Results => &["class_instance", "student"],
        Collection::SubjectResults => &["result", "template", "result__class_instance"],
        _ => &[],
    }
}

fn foreign_keys(collection: Collection) -> &'static [(&'static str, Collection)] {
    match collection {
        Collection::Subjects => &[("course", Collection::Courses)],
        Collection::Classes => &[
            ("course", Collection::Courses),
            ("instructor", Collection::Instructors),
        ],
        Collection::Results => &[
            ("student", Collection::Students),
            ("class_instance", Collection::Classes),
        ],
        _ => &[],
    }
}

fn scalar_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

fn matches(data: &Data, record: &Record, key: &str, expected: &str) -> bool {
    if key == "result__class_instance" {
        return id_field(record, "result")
            .and_then(|rid| data.get(Collection::Results, rid))
            .and_then(|r| r.get("class_instance"))
            .is_some_and(|v| scalar_eq(v, expected));
    }
    record.get(key).is_some_and(|v| scalar_eq(v, expected))
}

fn matches_search(record: &Record, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    record
        .values()
        .filter_map(Value::as_str)
        .any(|s| s.to_lowercase().contains(&needle))
}

pub(crate) fn list(backend: &FakeBackend, collection: Collection, params: &HashMap<String, String>) -> Response {
    let data = backend.data();
    let search = params.get("search").filter(|s| !s.trim().is_empty());

    let matching: Vec<&Record> = data
        .table(collection)
        .filter(|r| {
            filterable(collection)
                .iter()
                .filter_map(|key| params.get(*key).map(|v| (*key, v)))
                .all(|(key, expected)| matches(&data, r, key, expected))
        })
        .filter(|r| search.is_none_or(|s| matches_search(r, s)))
        .collect();

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
    let size: usize = params
        .get("page_size")
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let count = matching.len();
    let start = (page - 1) * size;
    if start > 0 && start >= count {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Invalid page." }))).into_response();
    }

    let results: Vec<Value> = matching
        .iter()
        .skip(start)
        .take(size)
        .map(|r| render(&data, collection, r))
        .collect();
    let link = |n: usize| format!("http://testserver/api/{}/?page={n}", collection.path());

    Json(json!({
        "count": count,
        "next": (start + size < count).then(|| link(page + 1)),
        "previous": (page > 1).then(|| link(page - 1)),
        "results": results,
    }))
    .into_response()
}

pub(crate) fn retrieve(backend: &FakeBackend, collection: Collection, id: i64) -> Response {
    let data = backend.data();
    match data.get(collection, id) {
        Some(record) => Json(render(&data, collection, record)).into_response(),
        None => not_found(),
    }
}

/// Checks required fields, foreign keys and uniqueness for a write.
pub(crate) fn validate(
    data: &Data,
    collection: Collection,
    record: &Record,
    own_id: Option<i64>,
) -> Vec<(String, String)> {
    let mut errors = Vec::new();

    for field in collection.required() {
        let missing = match record.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            _ => false,
        };
        if missing {
            errors.push((field.to_string(), "This field is required.".to_string()));
        }
    }

    for (field, target) in foreign_keys(collection) {
        if let Some(value) = record.get(*field).filter(|v| !v.is_null()) {
            if as_id(value).and_then(|id| data.get(*target, id)).is_none() {
                errors.push((
                    field.to_string(),
                    format!("Invalid pk \"{}\" - object does not exist.", value.to_string().trim_matches('"')),
                ));
            }
        }
    }

    if collection == Collection::Students {
        if let Some(id_number) = record.get("id_number").and_then(Value::as_str) {
            let taken = data.table(collection).any(|s| {
                s.get("id_number").and_then(Value::as_str) == Some(id_number)
                    && id_field(s, "id") != own_id
            });
            if taken {
                errors.push((
                    "id_number".to_string(),
                    "student with this id number already exists.".to_string(),
                ));
            }
        }
    }

    if collection == Collection::Classes {
        if let Some(ids) = record.get("students").and_then(Value::as_array) {
            for value in ids {
                if as_id(value).and_then(|id| data.get(Collection::Students, id)).is_none() {
                    errors.push((
                        "students".to_string(),
                        format!("Invalid pk \"{}\" - object does not exist.", value.to_string().trim_matches('"')),
                    ));
                }
            }
        }
    }

    errors
}

fn normalize(collection: Collection, mut record: Record) -> Record {
    record.remove("id");
    if collection == Collection::Classes {
        if let Some(Value::Array(ids)) = record.get("students") {
            let ids: Vec<Value> = ids.iter().filter_map(as_id).map(|id| json!(id)).collect();
            record.insert("students".into(), Value::Array(ids));
        }
    }
    record
}

pub(crate) fn create(backend: &FakeBackend, collection: Collection, body: Value) -> Response {
    let Value::Object(fields) = body else {
        return field_errors(vec![("non_field_errors".into(), "Invalid data.".into())]);
    };
    let mut record = collection.defaults();
    record.extend(normalize(collection, fields));

    let mut data = backend.data();
    let errors = validate(&data, collection, &record, None);
    if !errors.is_empty() {
        return field_errors(errors);
    }
    let stored = data.insert(collection, None, record);
    (StatusCode::CREATED, Json(render(&data, collection, &stored))).into_response()
}

pub(crate) fn update(backend: &FakeBackend, collection: Collection, id: i64, body: Value, partial: bool) -> Response {
    let Value::Object(fields) = body else {
        return field_errors(vec![("non_field_errors".into(), "Invalid data.".into())]);
    };

    let mut data = backend.data();
    let Some(existing) = data.get(collection, id) else {
        return not_found();
    };

    let mut record = if partial {
        existing.clone()
    } else {
        let mut fresh = collection.defaults();
        fresh.insert("id".into(), json!(id));
        fresh
    };
    record.extend(normalize(collection, fields));

    let errors = validate(&data, collection, &record, Some(id));
    if !errors.is_empty() {
        return field_errors(errors);
    }
    let stored = data.insert(collection, Some(id), record);
    Json(render(&data, collection, &stored)).into_response()
}

pub(crate) fn destroy(backend: &FakeBackend, collection: Collection, id: i64) -> Response {
    match backend.data().remove(collection, id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}
