use crate::service::Resource;
use client::{ApiClient, ClientError, ListQuery};
use serde::Serialize;
use validator::Validate;

pub use crate::models::subject_result::SubjectResult;

/// A partial marks update. Absent fields are left untouched on the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Validate)]
pub struct MarksPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Theory mark cannot be negative"))]
    pub theory_marks: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "Practical mark cannot be negative"))]
    pub practical_marks: Option<f64>,
}

impl MarksPatch {
    pub fn is_empty(&self) -> bool {
        self.theory_marks.is_none() && self.practical_marks.is_none()
    }
}

/// Rows are created by the backend together with their Result, so this
/// service only reads and patches.
#[derive(Clone)]
pub struct SubjectResultService {
    client: ApiClient,
}

impl SubjectResultService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // ↓↓↓ CUSTOM METHODS CAN BE DEFINED HERE ↓↓↓

    /// Every marks row of a class, optionally narrowed to one Result.
    pub async fn list_for_class(&self, class: i64, result: Option<i64>) -> Result<Vec<SubjectResult>, ClientError> {
        let mut query = ListQuery::new().filter("result__class_instance", class);
        if let Some(result) = result {
            query = query.filter("result", result);
        }
        self.list_all(&query).await
    }

    pub async fn patch(&self, id: i64, marks: &MarksPatch) -> Result<SubjectResult, ClientError> {
        self.update(id, marks).await
    }
}

impl Resource for SubjectResultService {
    type Model = SubjectResult;
    type Create = MarksPatch;
    type Update = MarksPatch;

    const PATH: &'static str = "/subject-results/";

    fn client(&self) -> &ApiClient {
        &self.client
    }

    async fn create(&self, _payload: &MarksPatch) -> Result<SubjectResult, ClientError> {
        Err(ClientError::InvalidInput(
            "subject results are created together with their result".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = MarksPatch {
            theory_marks: Some(78.0),
            practical_marks: None,
        };
        assert_eq!(serde_json::to_value(patch).unwrap(), json!({ "theory_marks": 78.0 }));
        assert!(!patch.is_empty());
        assert!(MarksPatch::default().is_empty());
    }
}
