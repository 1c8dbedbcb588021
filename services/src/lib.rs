//! Typed access to each backend collection.
//!
//! Every service wraps a shared [`client::ApiClient`] and implements
//! [`service::Resource`], which supplies list / get / create / update / delete.
//! Collection-specific actions (class membership, result get-or-create, marks
//! patches) live on the concrete service.

pub mod class_service;
pub mod course_service;
pub mod dashboard;
pub mod instructor_service;
pub mod models;
pub mod result_service;
pub mod service;
pub mod student_service;
pub mod subject_result_service;
pub mod subject_service;

pub use service::Resource;
