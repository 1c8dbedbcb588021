use fake_backend::{Collection, FakeBackend, spawn};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn token(base: &str) -> String {
    let body: Value = reqwest::Client::new()
        .post(format!("{base}/api/token/"))
        .json(&json!({ "username": "admin", "password": "admin123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["access"].as_str().unwrap().to_string()
}

/// Test Case: Protected routes refuse requests without a bearer token
#[tokio::test]
async fn test_requires_credentials() {
    let server = spawn(FakeBackend::new()).await.unwrap();
    let response = reqwest::get(format!("{}/api/students/", server.base_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Test Case: Listings paginate with next links and honour filters
#[tokio::test]
async fn test_pagination_and_filters() {
    let backend = FakeBackend::new();
    let course = backend.insert(Collection::Courses, json!({ "name": "C" }));
    for i in 0..15 {
        backend.insert(Collection::Subjects, json!({ "course": course, "name": format!("S{i}") }));
    }
    backend.insert(Collection::Subjects, json!({ "course": 99, "name": "Elsewhere" }));
    let server = spawn(backend).await.unwrap();
    let token = token(&server.base_url).await;
    let http = reqwest::Client::new();

    let first: Value = http
        .get(format!("{}/api/subjects/?course={course}", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["count"], 15);
    assert_eq!(first["results"].as_array().unwrap().len(), 10);
    assert!(first["next"].is_string());

    let second: Value = http
        .get(format!("{}/api/subjects/?course={course}&page=2", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["results"].as_array().unwrap().len(), 5);
    assert!(second["next"].is_null());
}

/// Test Case: Creating a Result seeds one empty marks row per subject
#[tokio::test]
async fn test_get_or_create_seeds_marks_rows() {
    let backend = FakeBackend::new();
    let course = backend.insert(Collection::Courses, json!({ "name": "C" }));
    backend.insert(Collection::Subjects, json!({ "course": course, "name": "A" }));
    backend.insert(Collection::Subjects, json!({ "course": course, "name": "B" }));
    let student = backend.insert(Collection::Students, json!({ "first_name": "F", "last_name": "L", "id_number": "1", "contact_number": "2" }));
    let class = backend.insert(Collection::Classes, json!({ "course": course, "instructor": 1, "course_number": "1", "batch_number": "1" }));
    let server = spawn(backend.clone()).await.unwrap();
    let token = token(&server.base_url).await;
    let http = reqwest::Client::new();

    let url = format!("{}/api/results/get_or_create/", server.base_url);
    let body = json!({ "student": student, "class_instance": class });
    let created = http.post(&url).bearer_auth(&token).json(&body).send().await.unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let again = http.post(&url).bearer_auth(&token).json(&body).send().await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);

    assert_eq!(backend.records(Collection::Results).len(), 1);
    assert_eq!(backend.records(Collection::SubjectResults).len(), 2);
    assert_eq!(backend.results_created(), 1);
}
