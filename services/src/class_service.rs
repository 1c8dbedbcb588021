use crate::service::Resource;
use chrono::NaiveDate;
use client::{ApiClient, ApiRequest, ClientError, Method};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use validator::{Validate, ValidationError};

pub use crate::models::class_instance::ClassInstance;

fn dates_in_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => {
            Err(ValidationError::new("date_order").with_message("End date cannot be before start date".into()))
        }
        _ => Ok(()),
    }
}

/// Body of `POST /classes/` and of the full-replace `PUT /classes/{id}/`.
#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = "validate_class_dates"))]
pub struct ClassPayload {
    pub course: i64,
    pub instructor: i64,
    #[validate(length(min = 1, message = "Course number cannot be empty"))]
    pub course_number: String,
    #[validate(length(min = 1, message = "Batch number cannot be empty"))]
    pub batch_number: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub students: Vec<i64>,
}

fn validate_class_dates(payload: &ClassPayload) -> Result<(), ValidationError> {
    dates_in_order(payload.start_date, payload.end_date)
}

impl From<&ClassInstance> for ClassPayload {
    fn from(class: &ClassInstance) -> Self {
        Self {
            course: class.course,
            instructor: class.instructor,
            course_number: class.course_number.clone(),
            batch_number: class.batch_number.clone(),
            start_date: class.start_date,
            end_date: class.end_date,
            students: class.students.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ClassService {
    client: ApiClient,
}

impl ClassService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    // ↓↓↓ CUSTOM METHODS CAN BE DEFINED HERE ↓↓↓

    /// Replaces the class membership with exactly `students`.
    pub async fn update_students(&self, class: i64, students: &[i64]) -> Result<ClassInstance, ClientError> {
        let request = ApiRequest::post(format!("{}update_students/", Self::item_path(class)))
            .json(&json!({ "students": students }))?;
        let updated = self.client.send(request).await?;
        info!(class, members = students.len(), "class roster replaced");
        Ok(updated)
    }

    /// Detaches one student; their Result and marks rows stay on the backend.
    pub async fn remove_student(&self, class: i64, student: i64) -> Result<(), ClientError> {
        let request = ApiRequest::post(format!("{}remove_student/", Self::item_path(class)))
            .json(&json!({ "student_id": student }))?;
        self.client.send_unit(request).await?;
        info!(class, student, "student removed from class");
        Ok(())
    }
}

impl Resource for ClassService {
    type Model = ClassInstance;
    type Create = ClassPayload;
    type Update = ClassPayload;

    const PATH: &'static str = "/classes/";
    const UPDATE_METHOD: Method = Method::PUT;

    fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::check;

    fn payload() -> ClassPayload {
        ClassPayload {
            course: 1,
            instructor: 2,
            course_number: "C-01".into(),
            batch_number: "B1".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            students: vec![],
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        match check(&payload()) {
            Err(ClientError::InvalidInput(msg)) => assert!(msg.contains("End date cannot be before start date"), "{msg}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn open_ended_class_is_fine() {
        let mut p = payload();
        p.end_date = None;
        assert!(check(&p).is_ok());
    }
}
