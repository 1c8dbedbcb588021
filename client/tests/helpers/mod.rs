use client::{ApiClient, ClientConfig, MemoryTokenStore, TokenStore};
use fake_backend::{FakeBackend, Spawned, spawn};
use std::time::Duration;

pub async fn start_backend() -> (FakeBackend, Spawned) {
    let backend = FakeBackend::new();
    let server = spawn(backend.clone()).await.expect("Failed to spawn fake backend");
    (backend, server)
}

pub fn client_for(server: &Spawned, store: impl TokenStore + 'static) -> ApiClient {
    ApiClient::new(ClientConfig::new(&server.base_url), store).expect("Failed to build client")
}

pub fn client_with_timeout(server: &Spawned, timeout: Duration) -> ApiClient {
    ApiClient::new(
        ClientConfig::new(&server.base_url).with_timeout(timeout),
        MemoryTokenStore::new(),
    )
    .expect("Failed to build client")
}

pub async fn logged_in(server: &Spawned) -> ApiClient {
    let client = client_for(server, MemoryTokenStore::new());
    client.login("admin", "admin123").await.expect("Failed to log in");
    client
}
