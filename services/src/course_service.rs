use crate::service::Resource;
use client::ApiClient;
use serde::Serialize;
use validator::Validate;

pub use crate::models::course::Course;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateCourse {
    #[validate(length(min = 1, message = "Course name cannot be empty"))]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Course name cannot be empty"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

#[derive(Clone)]
pub struct CourseService {
    client: ApiClient,
}

impl CourseService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl Resource for CourseService {
    type Model = Course;
    type Create = CreateCourse;
    type Update = UpdateCourse;

    const PATH: &'static str = "/courses/";

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
