//! # Class roster workbench
//!
//! Loads one class together with its course, subject templates, the student
//! directory, Results and per-subject marks, lets an operator edit membership
//! and marks, and writes the changes back.
//!
//! ## Saving marks
//! Students without a Result get one lazily through get-or-create. Only
//! fields that parse as numbers and differ from the stored value are sent,
//! one PATCH per changed row, all concurrently. The marks are then re-read
//! from the backend whatever the outcome.
//!
//! ## Cancellation
//! Every backend call races the workbench's [`CancellationToken`]; cancelling
//! it turns the pending operation into [`RosterError::Cancelled`].
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod error;
pub mod keys;
pub mod marks;
pub mod workbench;

pub use error::RosterError;
pub use keys::MarkKey;
pub use marks::{MarkField, MarksEdit, format_mark, parse_mark};
pub use workbench::{MarksSaveReport, RosterOptions, RosterWorkbench};
