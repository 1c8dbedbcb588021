use super::de;
use serde::{Deserialize, Serialize};

/// A subject template: one column of a course's marks grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    #[serde(deserialize_with = "de::id_ref")]
    pub course: i64,
    pub name: String,
    #[serde(default = "default_max", deserialize_with = "de::decimal")]
    pub max_theory: f64,
    #[serde(default = "default_max", deserialize_with = "de::decimal")]
    pub max_practical: f64,
}

fn default_max() -> f64 {
    100.0
}
