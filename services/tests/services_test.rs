mod helpers;

use client::{ClientError, ListQuery, StatusCode};
use fake_backend::Collection;
use helpers::logged_in;
use serde_json::json;
use services::{
    Resource,
    class_service::{ClassPayload, ClassService},
    course_service::{CourseService, CreateCourse},
    dashboard::dashboard_counts,
    instructor_service::{CreateInstructor, InstructorService, SignatureUpload, UpdateInstructor},
    result_service::ResultService,
    student_service::{CreateStudent, StudentService, UpdateStudent},
    subject_result_service::{MarksPatch, SubjectResultService},
    subject_service::{CreateSubject, SubjectService},
};

fn new_student(first: &str, id_number: &str) -> CreateStudent {
    CreateStudent {
        first_name: first.into(),
        second_name: None,
        last_name: "Tester".into(),
        id_number: id_number.into(),
        contact_number: "0820000000".into(),
    }
}

struct ClassFixture {
    course: i64,
    class: i64,
    templates: Vec<i64>,
    students: Vec<i64>,
}

fn seed_class(backend: &fake_backend::FakeBackend) -> ClassFixture {
    let course = backend.insert(Collection::Courses, json!({ "name": "Grade E" }));
    let templates = ["Theory of Law", "Firearms"]
        .iter()
        .map(|name| backend.insert(Collection::Subjects, json!({ "course": course, "name": name, "max_theory": 80 })))
        .collect();
    let instructor = backend.insert(Collection::Instructors, json!({ "first_name": "Sipho", "last_name": "Zulu" }));
    let students: Vec<i64> = (0..3)
        .map(|i| {
            backend.insert(
                Collection::Students,
                json!({ "first_name": format!("S{i}"), "last_name": "L", "id_number": format!("ID{i}"), "contact_number": "0" }),
            )
        })
        .collect();
    let class = backend.insert(
        Collection::Classes,
        json!({ "course": course, "instructor": instructor, "course_number": "E-1", "batch_number": "B", "students": students }),
    );
    ClassFixture {
        course,
        class,
        templates,
        students,
    }
}

/// Test Case: Student CRUD round trip through the generic resource methods
#[tokio::test]
async fn test_student_crud() {
    let (_backend, _server, client) = logged_in().await;
    let service = StudentService::new(client);

    let created = service.create(&new_student("Naledi", "8801010000000")).await.unwrap();
    assert_eq!(created.first_name, "Naledi");

    let updated = service
        .update(
            created.id,
            &UpdateStudent {
                last_name: Some("Khumalo".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.last_name, "Khumalo");
    assert_eq!(updated.first_name, "Naledi");

    let page = service.list(&ListQuery::new().search("khum")).await.unwrap();
    assert_eq!(page.count, 1);

    service.delete(created.id).await.unwrap();
    let err = service.get(created.id).await.unwrap_err();
    assert!(err.is_not_found());
}

/// Test Case: Backend validation errors come back flattened
#[tokio::test]
async fn test_duplicate_id_number_is_reported_by_field() {
    let (_backend, _server, client) = logged_in().await;
    let service = StudentService::new(client);

    service.create(&new_student("A", "7707070000000")).await.unwrap();
    let err = service.create(&new_student("B", "7707070000000")).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.user_message(), "id_number: student with this id number already exists.");
}

/// Test Case: Client-side validation stops the request before it is sent
#[tokio::test]
async fn test_invalid_payload_is_not_sent() {
    let (backend, _server, client) = logged_in().await;
    let service = CourseService::new(client);

    let err = service
        .create(&CreateCourse {
            name: String::new(),
            grade: None,
            description: None,
            price: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidInput(ref m) if m == "Course name cannot be empty"));
    assert!(backend.records(Collection::Courses).is_empty());
}

/// Test Case: Subjects filtered by course, walking every page
#[tokio::test]
async fn test_list_subjects_for_course() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let other = backend.insert(Collection::Courses, json!({ "name": "Other" }));
    let service = SubjectService::new(client);

    for i in 0..12 {
        service.create(&CreateSubject::new(other, format!("Extra {i}"))).await.unwrap();
    }

    let subjects = service.list_for_course(fixture.course).await.unwrap();
    assert_eq!(subjects.iter().map(|s| s.id).collect::<Vec<_>>(), fixture.templates);
    assert_eq!(subjects[0].max_theory, 80.0);

    // Default page size is 10, so this spans two pages.
    assert_eq!(service.list_for_course(other).await.unwrap().len(), 12);
}

/// Test Case: Instructor create and update go out as multipart forms
#[tokio::test]
async fn test_instructor_signature_upload() {
    let (_backend, _server, client) = logged_in().await;
    let service = InstructorService::new(client);

    let created = service
        .create(&CreateInstructor {
            first_name: "Thabo".into(),
            last_name: "Nkosi".into(),
            psira_number: Some("PS-77".into()),
            contact_number: None,
            signature: Some(SignatureUpload {
                file_name: "thabo.png".into(),
                mime: Some("image/png".into()),
                bytes: vec![0x89, 0x50, 0x4e, 0x47],
            }),
        })
        .await
        .unwrap();
    assert_eq!(created.signature.as_deref(), Some("/media/signatures/thabo.png"));
    assert_eq!(created.psira_number.as_deref(), Some("PS-77"));

    let updated = service
        .update(
            created.id,
            &UpdateInstructor {
                contact_number: Some("0831234567".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.contact_number.as_deref(), Some("0831234567"));
    assert_eq!(updated.signature.as_deref(), Some("/media/signatures/thabo.png"));
}

/// Test Case: update_students replaces the membership wholesale
#[tokio::test]
async fn test_update_students_is_full_replace() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let service = ClassService::new(client);

    let keep = fixture.students[2];
    let updated = service.update_students(fixture.class, &[keep]).await.unwrap();
    assert_eq!(updated.students, vec![keep]);

    let fetched = service.get(fixture.class).await.unwrap();
    assert_eq!(fetched.students, vec![keep]);
}

/// Test Case: update_students with an unknown id leaves the class untouched
#[tokio::test]
async fn test_update_students_rejects_unknown_ids() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let service = ClassService::new(client);

    let err = service.update_students(fixture.class, &[fixture.students[0], 999]).await.unwrap_err();
    assert_eq!(err.user_message(), "students: Invalid pk \"999\" - object does not exist.");
    assert_eq!(service.get(fixture.class).await.unwrap().students, fixture.students);
}

/// Test Case: remove_student detaches one member and keeps their marks rows
#[tokio::test]
async fn test_remove_student() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let result = backend.seed_result(fixture.students[0], fixture.class);
    let service = ClassService::new(client.clone());

    service.remove_student(fixture.class, fixture.students[0]).await.unwrap();
    let class = service.get(fixture.class).await.unwrap();
    assert_eq!(class.students, fixture.students[1..].to_vec());

    let rows = SubjectResultService::new(client)
        .list_for_class(fixture.class, Some(result))
        .await
        .unwrap();
    assert_eq!(rows.len(), fixture.templates.len());

    let again = service.remove_student(fixture.class, fixture.students[0]).await.unwrap_err();
    assert_eq!(again.status(), Some(StatusCode::BAD_REQUEST));
}

/// Test Case: Full update of a class via PUT
#[tokio::test]
async fn test_class_put_replaces_fields() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let service = ClassService::new(client);

    let mut payload = ClassPayload::from(&service.get(fixture.class).await.unwrap());
    payload.batch_number = "B2".into();
    payload.start_date = chrono::NaiveDate::from_ymd_opt(2026, 1, 5);

    let updated = service.update(fixture.class, &payload).await.unwrap();
    assert_eq!(updated.batch_number, "B2");
    assert_eq!(updated.start_date, payload.start_date);
    assert_eq!(updated.students, fixture.students);
}

/// Test Case: get_or_create returns the same Result on repeat calls
#[tokio::test]
async fn test_get_or_create_is_idempotent() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let service = ResultService::new(client.clone());

    let first = service.get_or_create(fixture.students[1], fixture.class).await.unwrap();
    let second = service.get_or_create(fixture.students[1], fixture.class).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.results_created(), 1);

    let rows = SubjectResultService::new(client)
        .list_for_class(fixture.class, Some(first.id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.theory_marks.is_none()));
}

/// Test Case: Without the get_or_create action the service looks up, then creates
#[tokio::test]
async fn test_get_or_create_fallback() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    backend.disable_get_or_create(true);
    let service = ResultService::new(client);

    let existing = backend.seed_result(fixture.students[0], fixture.class);
    let found = service.get_or_create(fixture.students[0], fixture.class).await.unwrap();
    assert_eq!(found.id, existing);
    assert_eq!(backend.results_created(), 0);

    let created = service.get_or_create(fixture.students[1], fixture.class).await.unwrap();
    assert_eq!(created.student, fixture.students[1]);
    assert_eq!(backend.results_created(), 1);

    let all = service.list_for_class(fixture.class).await.unwrap();
    assert_eq!(all.len(), 2);
}

/// Test Case: Marks patch is partial and out-of-range values are refused
#[tokio::test]
async fn test_patch_marks() {
    let (backend, _server, client) = logged_in().await;
    let fixture = seed_class(&backend);
    let result = backend.seed_result(fixture.students[0], fixture.class);
    let service = SubjectResultService::new(client);

    let row = service.list_for_class(fixture.class, Some(result)).await.unwrap().remove(0);
    let patched = service
        .patch(
            row.id,
            &MarksPatch {
                theory_marks: Some(61.5),
                practical_marks: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.theory_marks, Some(61.5));
    assert_eq!(patched.practical_marks, None);
    assert_eq!(patched.total_marks, Some(61.5));

    // max_theory is 80 for this course.
    let err = service
        .patch(
            row.id,
            &MarksPatch {
                theory_marks: Some(95.0),
                practical_marks: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert!(err.user_message().starts_with("theory_marks: "));

    let stored = service.get(row.id).await.unwrap();
    assert_eq!(stored.theory_marks, Some(61.5));
}

/// Test Case: Dashboard counts every collection
#[tokio::test]
async fn test_dashboard_counts() {
    let (backend, _server, client) = logged_in().await;
    seed_class(&backend);

    let counts = dashboard_counts(&client).await.unwrap();
    assert_eq!(counts.students, 3);
    assert_eq!(counts.courses, 1);
    assert_eq!(counts.instructors, 1);
    assert_eq!(counts.classes, 1);
}
