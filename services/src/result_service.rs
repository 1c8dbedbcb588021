use crate::service::Resource;
use client::{ApiClient, ApiRequest, ClientError, ListQuery, StatusCode};
use serde::Serialize;
use tracing::{debug, info};
use validator::Validate;

pub use crate::models::result::ResultRecord;

/// The (student, class) pair identifying a Result.
#[derive(Debug, Clone, Copy, Serialize, Validate)]
pub struct ResultKey {
    pub student: i64,
    pub class_instance: i64,
}

#[derive(Clone)]
pub struct ResultService {
    client: ApiClient,
}

impl ResultService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // ↓↓↓ CUSTOM METHODS CAN BE DEFINED HERE ↓↓↓

    pub async fn list_for_class(&self, class: i64) -> Result<Vec<ResultRecord>, ClientError> {
        self.list_all(&ListQuery::new().filter("class_instance", class)).await
    }

    pub async fn find(&self, student: i64, class: i64) -> Result<Option<ResultRecord>, ClientError> {
        let query = ListQuery::new()
            .filter("student", student)
            .filter("class_instance", class);
        let page = self.list(&query).await?;
        Ok(page.results.into_iter().next())
    }

    /// Returns the student's Result for `class`, creating it if needed.
    ///
    /// Uses `/results/get_or_create/`. Backends without that action (404/405)
    /// get a lookup followed by a plain create; a create that loses a race to
    /// another writer is resolved by looking the row up again.
    pub async fn get_or_create(&self, student: i64, class: i64) -> Result<ResultRecord, ClientError> {
        let key = ResultKey {
            student,
            class_instance: class,
        };
        let request = ApiRequest::post(format!("{}get_or_create/", Self::PATH)).json(&key)?;

        match self.client.send::<ResultRecord>(request).await {
            Ok(result) => {
                debug!(student, class, result = result.id, "result obtained");
                Ok(result)
            }
            Err(err) if matches!(err.status(), Some(StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED)) => {
                debug!(student, class, "get_or_create unavailable; falling back to lookup");
                self.find_or_create(key).await
            }
            Err(err) => Err(err),
        }
    }

    async fn find_or_create(&self, key: ResultKey) -> Result<ResultRecord, ClientError> {
        if let Some(existing) = self.find(key.student, key.class_instance).await? {
            return Ok(existing);
        }

        match self.create(&key).await {
            Ok(created) => {
                info!(student = key.student, class = key.class_instance, result = created.id, "result created");
                Ok(created)
            }
            Err(err) if is_duplicate(&err) => self
                .find(key.student, key.class_instance)
                .await?
                .ok_or(err),
            Err(err) => Err(err),
        }
    }
}

/// A 400 saying the (student, class) pair is already taken.
fn is_duplicate(err: &ClientError) -> bool {
    match err {
        ClientError::Api { status, body } if *status == StatusCode::BAD_REQUEST => {
            let text = body.summary().to_lowercase();
            text.contains("unique") || text.contains("already exists")
        }
        _ => false,
    }
}

impl Resource for ResultService {
    type Model = ResultRecord;
    type Create = ResultKey;
    type Update = ResultKey;

    const PATH: &'static str = "/results/";

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
