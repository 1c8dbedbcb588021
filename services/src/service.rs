use client::{ApiClient, ApiRequest, ClientError, ListQuery, Method, Page};
use common::format_validation_errors;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use validator::Validate;

/// Runs the payload's `validator` rules before anything goes over the wire.
pub fn check<T: Validate>(payload: &T) -> Result<(), ClientError> {
    payload
        .validate()
        .map_err(|e| ClientError::InvalidInput(format_validation_errors(&e)))
}

/// A backend collection exposed as `/<path>/` and `/<path>/<id>/`.
///
/// Implementors only name the collection and hand out their client; the CRUD
/// calls come for free and can be overridden where a collection differs
/// (multipart bodies, missing verbs, extra actions).
pub trait Resource: Send + Sync {
    type Model: DeserializeOwned + Send + Sync + 'static;
    type Create: Serialize + Validate + Send + Sync;
    type Update: Serialize + Validate + Send + Sync;

    /// Collection path with both slashes, e.g. `/students/`.
    const PATH: &'static str;

    /// Verb used by [`Resource::update`].
    const UPDATE_METHOD: Method = Method::PATCH;

    fn client(&self) -> &ApiClient;

    fn item_path(id: i64) -> String {
        format!("{}{id}/", Self::PATH)
    }

    fn list(&self, query: &ListQuery) -> impl Future<Output = Result<Page<Self::Model>, ClientError>> + Send {
        async move { self.client().list(Self::PATH, query).await }
    }

    fn list_all(&self, query: &ListQuery) -> impl Future<Output = Result<Vec<Self::Model>, ClientError>> + Send {
        async move { self.client().list_all(Self::PATH, query).await }
    }

    fn get(&self, id: i64) -> impl Future<Output = Result<Self::Model, ClientError>> + Send {
        async move { self.client().send(ApiRequest::get(Self::item_path(id))).await }
    }

    fn create(&self, payload: &Self::Create) -> impl Future<Output = Result<Self::Model, ClientError>> + Send {
        async move {
            check(payload)?;
            let request = ApiRequest::post(Self::PATH).json(payload)?;
            self.client().send(request).await
        }
    }

    fn update(
        &self,
        id: i64,
        payload: &Self::Update,
    ) -> impl Future<Output = Result<Self::Model, ClientError>> + Send {
        async move {
            check(payload)?;
            let request = ApiRequest::new(Self::UPDATE_METHOD, Self::item_path(id)).json(payload)?;
            self.client().send(request).await
        }
    }

    fn delete(&self, id: i64) -> impl Future<Output = Result<(), ClientError>> + Send {
        async move { self.client().send_unit(ApiRequest::delete(Self::item_path(id))).await }
    }
}
