use client::{ApiClient, ClientConfig, MemoryTokenStore};
use fake_backend::{FakeBackend, Spawned, spawn};

/// Starts a fresh backend and returns it with a client already logged in as admin.
pub async fn logged_in() -> (FakeBackend, Spawned, ApiClient) {
    let backend = FakeBackend::new();
    let server = spawn(backend.clone()).await.expect("Failed to spawn fake backend");
    let client = ApiClient::new(ClientConfig::new(&server.base_url), MemoryTokenStore::new())
        .expect("Failed to build client");
    client
        .login("admin", "admin123")
        .await
        .expect("Failed to log in as admin");
    (backend, server, client)
}
