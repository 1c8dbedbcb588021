use super::de;
use serde::{Deserialize, Serialize};

/// Marks of one Result for one subject template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub id: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub result: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub template: i64,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub theory_marks: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub practical_marks: Option<f64>,
    /// Computed by the backend.
    #[serde(default, deserialize_with = "de::opt_decimal")]
    pub total_marks: Option<f64>,
}
