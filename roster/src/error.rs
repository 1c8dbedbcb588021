use client::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("class {0} not found")]
    ClassNotFound(i64),

    #[error("operation cancelled")]
    Cancelled,

    /// Some marks patches were rejected; the workbench was refreshed regardless.
    #[error("{failed} of {total} marks updates failed: {first_error}")]
    PartialSave {
        failed: usize,
        total: usize,
        first_error: String,
    },

    #[error("student {0} is not on this roster")]
    UnknownStudent(i64),

    #[error("subject {0} is not part of this course")]
    UnknownTemplate(i64),
}

impl RosterError {
    /// Operator-facing text; backend validation bodies come out flattened.
    pub fn user_message(&self) -> String {
        match self {
            RosterError::Client(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
