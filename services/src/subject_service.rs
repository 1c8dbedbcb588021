use crate::service::Resource;
use client::{ApiClient, ClientError, ListQuery};
use serde::Serialize;
use validator::Validate;

pub use crate::models::subject::Subject;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateSubject {
    pub course: i64,
    #[validate(length(min = 1, message = "Subject name cannot be empty"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "Maximum theory mark cannot be negative"))]
    pub max_theory: f64,
    #[validate(range(min = 0.0, message = "Maximum practical mark cannot be negative"))]
    pub max_practical: f64,
}

impl CreateSubject {
    /// A subject with the backend's default maxima of 100 / 100.
    pub fn new(course: i64, name: impl Into<String>) -> Self {
        Self {
            course,
            name: name.into(),
            max_theory: 100.0,
            max_practical: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateSubject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Subject name cannot be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Maximum theory mark cannot be negative"))]
    pub max_theory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Maximum practical mark cannot be negative"))]
    pub max_practical: Option<f64>,
}

#[derive(Clone)]
pub struct SubjectService {
    client: ApiClient,
}

impl SubjectService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Every subject template of a course, across all pages.
    pub async fn list_for_course(&self, course: i64) -> Result<Vec<Subject>, ClientError> {
        self.list_all(&ListQuery::new().filter("course", course)).await
    }
}

impl Resource for SubjectService {
    type Model = Subject;
    type Create = CreateSubject;
    type Update = UpdateSubject;

    const PATH: &'static str = "/subjects/";

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
