use crate::service::Resource;
use client::ApiClient;
use serde::Serialize;
use validator::Validate;

pub use crate::models::student::Student;

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateStudent {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_name: Option<String>,

    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: String,

    #[validate(length(min = 1, message = "ID number cannot be empty"))]
    pub id_number: String,

    #[validate(length(min = 1, message = "Contact number cannot be empty"))]
    pub contact_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateStudent {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "ID number cannot be empty"))]
    pub id_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
}

#[derive(Clone)]
pub struct StudentService {
    client: ApiClient,
}

impl StudentService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl Resource for StudentService {
    type Model = Student;
    type Create = CreateStudent;
    type Update = UpdateStudent;

    const PATH: &'static str = "/students/";

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
