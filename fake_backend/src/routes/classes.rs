use super::{as_id, bad_request, crud, field_errors, not_found, render};
use crate::state::{Collection, FakeBackend};
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
struct UpdateStudents {
    #[serde(default)]
    students: Vec<Value>,
}

#[derive(Deserialize)]
struct RemoveStudent {
    student_id: Option<Value>,
}

pub fn class_routes() -> Router<FakeBackend> {
    crud::crud_routes(Collection::Classes)
        .route("/classes/{id}/update_students/", post(update_students))
        .route("/classes/{id}/remove_student/", post(remove_student))
}

/// POST /api/classes/{id}/update_students/
///
/// Replaces the membership with exactly the given ids.
async fn update_students(
    State(backend): State<FakeBackend>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStudents>,
) -> Response {
    let mut data = backend.data();
    if data.get(Collection::Classes, id).is_none() {
        return not_found();
    }

    let mut ids = Vec::with_capacity(body.students.len());
    for value in &body.students {
        match as_id(value).filter(|sid| data.get(Collection::Students, *sid).is_some()) {
            Some(sid) if !ids.contains(&sid) => ids.push(sid),
            Some(_) => {}
            None => {
                return field_errors(vec![(
                    "students".into(),
                    format!("Invalid pk \"{}\" - object does not exist.", value.to_string().trim_matches('"')),
                )]);
            }
        }
    }

    if let Some(class) = data.get_mut(Collection::Classes, id) {
        class.insert("students".into(), json!(ids));
    }
    match data.get(Collection::Classes, id) {
        Some(class) => Json(render(&data, Collection::Classes, class)).into_response(),
        None => not_found(),
    }
}

/// POST /api/classes/{id}/remove_student/
async fn remove_student(
    State(backend): State<FakeBackend>,
    Path(id): Path<i64>,
    Json(body): Json<RemoveStudent>,
) -> Response {
    let Some(student) = body.student_id.as_ref().and_then(as_id) else {
        return bad_request(json!({ "detail": "student_id is required." }));
    };

    let mut data = backend.data();
    let Some(class) = data.get_mut(Collection::Classes, id) else {
        return not_found();
    };

    let mut members: Vec<i64> = class
        .get("students")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(as_id).collect())
        .unwrap_or_default();
    let before = members.len();
    members.retain(|m| *m != student);
    if members.len() == before {
        return bad_request(json!({ "detail": "Student is not enrolled in this class." }));
    }
    class.insert("students".into(), json!(members));

    match data.get(Collection::Classes, id) {
        Some(class) => Json(render(&data, Collection::Classes, class)).into_response(),
        None => not_found(),
    }
}
