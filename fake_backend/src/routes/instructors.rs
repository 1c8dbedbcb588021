//! Instructors are written as multipart forms because of the signature upload.

use super::{crud, field_errors, not_found, render};
use crate::state::{Collection, FakeBackend, Record};
use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::collections::HashMap;

pub fn instructor_routes() -> Router<FakeBackend> {
    Router::new()
        .route("/instructors/", get(list).post(create))
        .route(
            "/instructors/{id}/",
            get(retrieve).put(replace).patch(amend).delete(destroy),
        )
}

async fn list(State(backend): State<FakeBackend>, Query(params): Query<HashMap<String, String>>) -> Response {
    crud::list(&backend, Collection::Instructors, &params)
}

async fn retrieve(State(backend): State<FakeBackend>, Path(id): Path<i64>) -> Response {
    crud::retrieve(&backend, Collection::Instructors, id)
}

async fn destroy(State(backend): State<FakeBackend>, Path(id): Path<i64>) -> Response {
    crud::destroy(&backend, Collection::Instructors, id)
}

/// Text parts become string fields; a `signature` file becomes its media path.
async fn read_form(mut multipart: Multipart) -> Result<Record, Response> {
    let mut record = Record::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(field_errors(vec![("non_field_errors".into(), err.body_text())]));
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            if field.bytes().await.is_err() {
                return Err(field_errors(vec![(name, "The submitted file is empty.".into())]));
            }
            record.insert(name, json!(format!("/media/signatures/{file_name}")));
        } else {
            let text = field.text().await.unwrap_or_default();
            record.insert(name, Value::String(text));
        }
    }
    Ok(record)
}

async fn create(State(backend): State<FakeBackend>, multipart: Multipart) -> Response {
    let fields = match read_form(multipart).await {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    let mut record = Collection::Instructors.defaults();
    record.insert("signature".into(), Value::Null);
    record.extend(fields);

    let mut data = backend.data();
    let errors = crud::validate(&data, Collection::Instructors, &record, None);
    if !errors.is_empty() {
        return field_errors(errors);
    }
    let stored = data.insert(Collection::Instructors, None, record);
    (StatusCode::CREATED, Json(render(&data, Collection::Instructors, &stored))).into_response()
}

async fn replace(state: State<FakeBackend>, id: Path<i64>, multipart: Multipart) -> Response {
    write(state, id, multipart).await
}

async fn amend(state: State<FakeBackend>, id: Path<i64>, multipart: Multipart) -> Response {
    write(state, id, multipart).await
}

/// A missing signature part keeps the stored one.
async fn write(State(backend): State<FakeBackend>, Path(id): Path<i64>, multipart: Multipart) -> Response {
    let fields = match read_form(multipart).await {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    let mut data = backend.data();
    let Some(existing) = data.get(Collection::Instructors, id) else {
        return not_found();
    };
    let mut record = existing.clone();
    record.extend(fields);
    record.remove("id");

    let errors = crud::validate(&data, Collection::Instructors, &record, Some(id));
    if !errors.is_empty() {
        return field_errors(errors);
    }
    let stored = data.insert(Collection::Instructors, Some(id), record);
    Json(render(&data, Collection::Instructors, &stored)).into_response()
}
