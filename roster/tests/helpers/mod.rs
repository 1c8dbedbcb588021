use client::{ApiClient, ClientConfig, MemoryTokenStore};
use fake_backend::{Collection, FakeBackend, Spawned, spawn};
use serde_json::{Value, json};

pub const CLASS_ID: i64 = 7;
pub const TEMPLATES: [i64; 3] = [1, 2, 3];
/// Enrolled in class 7.
pub const MEMBERS: std::ops::RangeInclusive<i64> = 1..=12;
/// In the directory but not in the class.
pub const OUTSIDER: i64 = 13;
/// Members whose Results already carry marks.
pub const MARKED: std::ops::RangeInclusive<i64> = 1..=5;

pub struct TestData {
    pub backend: FakeBackend,
    pub _server: Spawned,
    pub client: ApiClient,
}

/// Class 7 of a three-subject course: students 1..=12 enrolled, each with a
/// Result; students 1..=5 have theory 65 / practical 70 on every subject.
/// Student 13 exists but is not enrolled.
pub async fn setup_test_data() -> TestData {
    let backend = FakeBackend::new();

    backend.insert_with_id(Collection::Courses, 1, json!({ "name": "Grade D", "grade": "D" }));
    for (id, name) in TEMPLATES.iter().zip(["Law", "Patrolling", "First Aid"]) {
        backend.insert_with_id(Collection::Subjects, *id, json!({ "course": 1, "name": name }));
    }
    backend.insert_with_id(
        Collection::Instructors,
        1,
        json!({ "first_name": "Sipho", "last_name": "Zulu" }),
    );
    for id in 1..=OUTSIDER {
        backend.insert_with_id(
            Collection::Students,
            id,
            json!({
                "first_name": format!("Student{id}"),
                "last_name": if id % 2 == 0 { "Even" } else { "Odd" },
                "id_number": format!("90010150000{id:02}"),
                "contact_number": "0820000000",
            }),
        );
    }
    backend.insert_with_id(
        Collection::Classes,
        CLASS_ID,
        json!({
            "course": 1,
            "instructor": 1,
            "course_number": "D-2026-07",
            "batch_number": "B7",
            "students": MEMBERS.collect::<Vec<_>>(),
        }),
    );

    for student in MEMBERS {
        let result = backend.seed_result(student, CLASS_ID);
        if MARKED.contains(&student) {
            for row in rows_of(&backend, result) {
                backend.update_record(
                    Collection::SubjectResults,
                    row["id"].as_i64().unwrap(),
                    json!({ "theory_marks": 65.0, "practical_marks": 70.0, "total_marks": 135.0 }),
                );
            }
        }
    }

    let server = spawn(backend.clone()).await.expect("Failed to spawn fake backend");
    let client = ApiClient::new(ClientConfig::new(&server.base_url), MemoryTokenStore::new())
        .expect("Failed to build client");
    client.login("admin", "admin123").await.expect("Failed to log in");

    TestData {
        backend,
        _server: server,
        client,
    }
}

pub fn rows_of(backend: &FakeBackend, result: i64) -> Vec<Value> {
    backend
        .records(Collection::SubjectResults)
        .into_iter()
        .filter(|r| r["result"].as_i64() == Some(result))
        .collect()
}

pub fn result_of(backend: &FakeBackend, student: i64) -> Option<i64> {
    backend
        .records(Collection::Results)
        .into_iter()
        .find(|r| r["student"].as_i64() == Some(student) && r["class_instance"].as_i64() == Some(CLASS_ID))
        .and_then(|r| r["id"].as_i64())
}

/// Stored mark of one cell, straight from the backend's tables.
pub fn stored_mark(backend: &FakeBackend, student: i64, template: i64, field: &str) -> Option<f64> {
    let result = result_of(backend, student)?;
    rows_of(backend, result)
        .into_iter()
        .find(|r| r["template"].as_i64() == Some(template))
        .and_then(|r| r[field].as_f64())
}
