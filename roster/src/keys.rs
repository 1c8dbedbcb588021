use services::subject_result_service::SubjectResult;
use std::fmt;

/// Identifies one cell of the marks grid: a Result crossed with a subject template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkKey {
    pub result: i64,
    pub template: i64,
}

impl MarkKey {
    pub fn new(result: i64, template: i64) -> Self {
        Self { result, template }
    }

    pub fn of(row: &SubjectResult) -> Self {
        Self::new(row.result, row.template)
    }
}

impl fmt::Display for MarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.result, self.template)
    }
}
