//! An in-process stand-in for the school management REST backend.
//!
//! Serves the same `/api/...` surface the client talks to: JWT token
//! endpoints, paginated CRUD collections, class membership actions, results
//! and per-subject marks. State lives in memory and tests reach into it
//! through [`FakeBackend`] to seed records, flip failure switches and read
//! counters.

mod auth;
pub mod routes;
mod state;

pub use state::{Collection, FakeBackend};

use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// A backend listening on a local port.
pub struct Spawned {
    pub addr: SocketAddr,
    /// `http://127.0.0.1:<port>`, without the `/api` suffix.
    pub base_url: String,
}

pub fn router(backend: FakeBackend) -> Router {
    routes::routes(backend)
}

/// Serves `backend` on a random local port for the rest of the runtime's life.
pub async fn spawn(backend: FakeBackend) -> std::io::Result<Spawned> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(backend);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "fake backend stopped");
        }
    });

    Ok(Spawned {
        addr,
        base_url: format!("http://{addr}"),
    })
}
