use crate::error::{ApiErrorBody, ClientError, RefreshError, error_code};
use crate::pagination::{ListQuery, Listing, Page};
use crate::refresh::{self, Join, RefreshGuard, RefreshPhase, RefreshQueue};
use crate::request::{ApiRequest, RequestBody, build_form};
use crate::session::{Session, SessionStore, TokenStore};
use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Connection settings for an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin such as `http://localhost:8000`; `/api` is appended.
    pub api_base: String,
    /// Upper bound for every call, the refresh call included.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn api_root(&self) -> String {
        format!("{}/api", self.api_base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutReason {
    /// No token was stored when the client started.
    NeverSignedIn,
    /// The operator logged out.
    Logout,
    /// The refresh protocol failed; the message says why.
    SessionExpired(String),
}

/// Published on every login/logout so a front end can send the operator back to
/// the login view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    SignedIn,
    SignedOut(SignOutReason),
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenPair {
    access: String,
    refresh: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

struct RawResponse {
    status: StatusCode,
    body: Bytes,
}

impl RawResponse {
    /// 401, or the 403 the backend uses for an expired or invalid JWT.
    fn is_token_rejection(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
            || (self.status == StatusCode::FORBIDDEN
                && error_code(&self.body).as_deref() == Some("token_not_valid"))
    }

    fn into_result(self) -> Result<Bytes, ClientError> {
        if self.status.is_success() {
            Ok(self.body)
        } else {
            Err(ClientError::Api {
                status: self.status,
                body: ApiErrorBody::parse(&self.body),
            })
        }
    }
}

struct Inner {
    http: reqwest::Client,
    api_root: String,
    session: SessionStore,
    refresh: Mutex<RefreshQueue>,
    auth: watch::Sender<AuthStatus>,
}

/// Authenticated client for the back-office REST API.
///
/// Cloning is cheap and every clone shares the same session and refresh queue.
/// Separate `ApiClient::new` calls are fully independent, which keeps tests from
/// interfering with each other.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: impl TokenStore + 'static) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let session = SessionStore::open(Box::new(store))?;

        let initial = if session.access_token().is_some() {
            AuthStatus::SignedIn
        } else {
            AuthStatus::SignedOut(SignOutReason::NeverSignedIn)
        };
        let (auth, _) = watch::channel(initial);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                api_root: config.api_root(),
                session,
                refresh: Mutex::new(RefreshQueue::default()),
                auth,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.api_root, path)
    }

    // --- Session ---

    /// Presence of an access token is what gates the protected views.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.access_token().is_some()
    }

    pub fn session(&self) -> Session {
        self.inner.session.snapshot()
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.inner.auth.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.inner.auth.subscribe()
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        refresh::lock(&self.inner.refresh).phase()
    }

    /// Exchanges credentials for a token pair and persists it.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .inner
            .http
            .post(self.url("/token/"))
            .json(&Credentials { username, password })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if status == StatusCode::UNAUTHORIZED {
            warn!(username, "login rejected");
            return Err(ClientError::InvalidCredentials);
        }
        let body = RawResponse { status, body }.into_result()?;
        let pair: TokenPair = serde_json::from_slice(&body)?;

        self.inner.session.replace(Session::new(pair.access, pair.refresh))?;
        self.inner.auth.send_replace(AuthStatus::SignedIn);
        info!(username, "signed in");
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        let cleared = self.inner.session.clear();
        self.inner
            .auth
            .send_replace(AuthStatus::SignedOut(SignOutReason::Logout));
        info!("signed out");
        cleared
    }

    /// Fails with [`ClientError::NotAuthenticated`] when no access token is stored.
    pub fn require_session(&self) -> Result<(), ClientError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    // --- Requests ---

    /// Sends `request`, recovering once from an expired access token.
    ///
    /// Returns the raw body of a 2xx response. Any other status, and any transport
    /// failure, is returned unchanged and never retried.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Bytes, ClientError> {
        let sent_with = self.inner.session.access_token();
        let first = self.dispatch(request, sent_with.as_deref()).await?;
        if !first.is_token_rejection() {
            return first.into_result();
        }

        // The one and only retry. If the store already holds a different token, a
        // refresh finished while this request was in flight: reuse its result.
        let token = match self.inner.session.access_token() {
            Some(current) if sent_with.as_ref() != Some(&current) => {
                debug!(path = %request.path, "token rotated while in flight; retrying");
                current
            }
            _ => self.refresh_access_token().await?,
        };

        let retried = self.dispatch(request, Some(&token)).await?;
        if retried.is_token_rejection() {
            warn!(path = %request.path, "refreshed token rejected; giving up");
        }
        retried.into_result()
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let body = self.execute(&request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// For endpoints whose response body is irrelevant (deletes, membership changes).
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ClientError> {
        self.execute(&request).await.map(|_| ())
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, ClientError> {
        let listing: Listing<T> = self
            .send(ApiRequest::get(path).query_pairs(query.to_pairs()))
            .await?;
        Ok(listing.into())
    }

    /// Walks every page of a listing, starting from `query.page` (or 1).
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Vec<T>, ClientError> {
        let mut query = query.clone();
        let mut page_no = query.page.unwrap_or(1);
        let mut all = Vec::new();

        loop {
            query.page = Some(page_no);
            let page: Page<T> = self.list(path, &query).await?;
            let done = !page.has_next() || page.results.is_empty();
            all.extend(page.results);
            if done {
                break;
            }
            page_no += 1;
        }
        Ok(all)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<RawResponse, ClientError> {
        let url = self.url(&request.path);
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .query(&request.query);

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        debug!(method = %request.method, %url, authenticated = token.is_some(), "sending request");
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(method = %request.method, %url, %status, "response received");

        Ok(RawResponse { status, body })
    }

    // --- Refresh protocol ---

    /// Obtains a fresh access token, performing at most one refresh call no matter
    /// how many requests ask for one at the same time.
    ///
    /// A follower whose leader was dropped mid-refresh joins the queue again, so
    /// the first surviving caller takes over the refresh.
    async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let guard = loop {
            let join = refresh::lock(&self.inner.refresh).join();
            match join {
                Join::Follower(waiter) => {
                    debug!("refresh already in flight; queued");
                    match waiter.await {
                        Ok(Err(RefreshError::Abandoned)) | Err(_) => {
                            debug!("refresh leader went away; rejoining");
                        }
                        Ok(outcome) => return outcome.map_err(ClientError::from),
                    }
                }
                Join::Leader => break RefreshGuard::new(&self.inner.refresh),
            }
        };

        info!("access token rejected; refreshing session");
        let outcome = self.call_refresh_endpoint().await;

        if let Err(err) = &outcome {
            warn!(error = %err, "session refresh failed; signing out");
            if let Err(clear_err) = self.inner.session.clear() {
                warn!(error = %clear_err, "failed to clear stored session");
            }
            self.inner
                .auth
                .send_replace(AuthStatus::SignedOut(SignOutReason::SessionExpired(err.to_string())));
        }

        let released = guard.finish(&outcome);
        if outcome.is_ok() {
            info!(released, "session refreshed");
        }
        outcome.map_err(ClientError::from)
    }

    /// Calls `/token/refresh/` directly on the HTTP client, bypassing `execute`, so
    /// a rejected refresh can never trigger another refresh.
    async fn call_refresh_endpoint(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .inner
            .session
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let response = self
            .inner
            .http
            .post(self.url("/token/refresh/"))
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: ApiErrorBody::parse(&body).summary(),
            });
        }

        let parsed: RefreshResponse =
            serde_json::from_slice(&body).map_err(|e| RefreshError::Malformed(e.to_string()))?;
        if parsed.access.trim().is_empty() {
            return Err(RefreshError::Malformed("empty access token".into()));
        }

        self.inner
            .session
            .store_refreshed(parsed.access.clone(), parsed.refresh)
            .map_err(|e| RefreshError::Storage(e.to_string()))?;
        Ok(parsed.access)
    }
}
