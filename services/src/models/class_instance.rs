use super::de;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One running batch of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInstance {
    pub id: i64,
    pub course_number: String,
    pub batch_number: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(deserialize_with = "de::id_ref")]
    pub course: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub instructor: i64,
    /// Enrolled student ids, in backend order.
    #[serde(default, deserialize_with = "de::id_refs")]
    pub students: Vec<i64>,
}

impl ClassInstance {
    pub fn label(&self) -> String {
        format!("{} / {}", self.course_number, self.batch_number)
    }
}
