use crate::service::{Resource, check};
use client::{ApiClient, ApiRequest, ClientError, FormField, Method};
use serde::Serialize;
use validator::Validate;

pub use crate::models::instructor::Instructor;

/// An image file to upload as the instructor's signature.
#[derive(Debug, Clone)]
pub struct SignatureUpload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SignatureUpload {
    fn field(&self) -> FormField {
        FormField::File {
            name: "signature".into(),
            file_name: self.file_name.clone(),
            mime: self.mime.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateInstructor {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: String,
    pub psira_number: Option<String>,
    pub contact_number: Option<String>,
    #[serde(skip)]
    pub signature: Option<SignatureUpload>,
}

#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct UpdateInstructor {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    pub psira_number: Option<String>,
    pub contact_number: Option<String>,
    /// Left out of the form when `None`, so the stored signature is kept.
    #[serde(skip)]
    pub signature: Option<SignatureUpload>,
}

fn text(fields: &mut Vec<FormField>, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        fields.push(FormField::Text {
            name: name.into(),
            value: value.clone(),
        });
    }
}

impl CreateInstructor {
    fn to_form(&self) -> Vec<FormField> {
        let mut fields = Vec::new();
        text(&mut fields, "first_name", Some(&self.first_name));
        text(&mut fields, "last_name", Some(&self.last_name));
        text(&mut fields, "psira_number", self.psira_number.as_ref());
        text(&mut fields, "contact_number", self.contact_number.as_ref());
        fields.extend(self.signature.as_ref().map(SignatureUpload::field));
        fields
    }
}

impl UpdateInstructor {
    fn to_form(&self) -> Vec<FormField> {
        let mut fields = Vec::new();
        text(&mut fields, "first_name", self.first_name.as_ref());
        text(&mut fields, "last_name", self.last_name.as_ref());
        text(&mut fields, "psira_number", self.psira_number.as_ref());
        text(&mut fields, "contact_number", self.contact_number.as_ref());
        fields.extend(self.signature.as_ref().map(SignatureUpload::field));
        fields
    }
}

#[derive(Clone)]
pub struct InstructorService {
    client: ApiClient,
}

impl InstructorService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl Resource for InstructorService {
    type Model = Instructor;
    type Create = CreateInstructor;
    type Update = UpdateInstructor;

    const PATH: &'static str = "/instructors/";
    const UPDATE_METHOD: Method = Method::PUT;

    fn client(&self) -> &ApiClient {
        &self.client
    }

    // ↓↓↓ OVERRIDE DEFAULT BEHAVIOR IF NEEDED HERE ↓↓↓

    async fn create(&self, payload: &CreateInstructor) -> Result<Instructor, ClientError> {
        check(payload)?;
        let request = ApiRequest::post(Self::PATH).multipart(payload.to_form());
        self.client.send(request).await
    }

    async fn update(&self, id: i64, payload: &UpdateInstructor) -> Result<Instructor, ClientError> {
        check(payload)?;
        let request = ApiRequest::new(Self::UPDATE_METHOD, Self::item_path(id)).multipart(payload.to_form());
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(fields: &[FormField]) -> Vec<&str> {
        fields
            .iter()
            .map(|f| match f {
                FormField::Text { name, .. } | FormField::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    #[test]
    fn update_without_signature_leaves_it_out_of_the_form() {
        let payload = UpdateInstructor {
            first_name: Some("Thabo".into()),
            ..Default::default()
        };
        assert_eq!(names(&payload.to_form()), vec!["first_name"]);
    }

    #[test]
    fn create_with_signature_appends_file_part() {
        let payload = CreateInstructor {
            first_name: "Thabo".into(),
            last_name: "Nkosi".into(),
            psira_number: Some("PS-1".into()),
            contact_number: None,
            signature: Some(SignatureUpload {
                file_name: "sig.png".into(),
                mime: Some("image/png".into()),
                bytes: vec![1, 2, 3],
            }),
        };
        assert_eq!(
            names(&payload.to_form()),
            vec!["first_name", "last_name", "psira_number", "signature"]
        );
    }
}
