use super::de;
use serde::{Deserialize, Serialize};

/// A student's enrolment record for one class; owns the per-subject marks rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub student: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub class_instance: i64,
}
