//! # Back-office API client
//!
//! An HTTP client for the institute's REST backend that attaches the stored bearer
//! token to every call and transparently recovers from access-token expiry.
//!
//! ## Key pieces
//! - [`ApiClient`]: cheap-to-clone handle; every request goes through it.
//! - [`SessionStore`] / [`TokenStore`]: where the access/refresh pair lives.
//! - [`refresh`]: the single-flight refresh queue. Concurrent 401s collapse into one
//!   call to `/token/refresh/`; everyone else waits in FIFO order for its outcome.
//! - [`pagination`]: the `{count, next, previous, results}` envelope.

pub mod client;
pub mod error;
pub mod pagination;
pub mod refresh;
pub mod request;
pub mod session;

pub use client::{ApiClient, AuthStatus, ClientConfig, SignOutReason};
pub use error::{ApiErrorBody, ClientError, RefreshError};
pub use pagination::{ListQuery, Page};
pub use request::{ApiRequest, FormField, RequestBody};
pub use session::{FileTokenStore, MemoryTokenStore, Session, SessionStore, TokenStore};
pub use refresh::RefreshPhase;
pub use reqwest::{Method, StatusCode};
