use fake_backend::{Collection, FakeBackend};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

fn seed(backend: &FakeBackend) {
    let course = backend.insert(
        Collection::Courses,
        json!({ "name": "Grade C Security", "grade": "C", "description": "Entry level", "price": "2500.00" }),
    );
    backend.insert(Collection::Subjects, json!({ "course": course, "name": "Legal Aspects" }));
    backend.insert(Collection::Subjects, json!({ "course": course, "name": "Patrolling" }));

    let instructor = backend.insert(
        Collection::Instructors,
        json!({ "first_name": "Thabo", "last_name": "Nkosi", "psira_number": "PS-0042", "contact_number": "0820000000", "signature": null }),
    );

    let mut students = Vec::new();
    for (first, last, id_number) in [
        ("Alice", "Mokoena", "9001015000081"),
        ("Brian", "Dlamini", "9102026000082"),
        ("Chloe", "Naidoo", "9203037000083"),
    ] {
        students.push(backend.insert(
            Collection::Students,
            json!({ "first_name": first, "last_name": last, "id_number": id_number, "contact_number": "0710000000" }),
        ));
    }

    let class = backend.insert(
        Collection::Classes,
        json!({
            "course": course,
            "instructor": instructor,
            "course_number": "C-2026-01",
            "batch_number": "B1",
            "students": students,
        }),
    );
    for student in students {
        backend.seed_result(student, class);
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("FAKE_BACKEND_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let backend = FakeBackend::new();
    seed(&backend);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    info!("fake backend listening on http://{addr} (admin / admin123)");

    axum::serve(listener, fake_backend::router(backend)).await
}
