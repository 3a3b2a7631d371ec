//! Form parsing and validation for posts, comments, and accounts.
//!
//! DESIGN
//! ======
//! Parsing turns a request body into a loose `*Input` struct and never
//! fails on bad values. Validation then turns the input into either a typed
//! value or `FormErrors` keyed by field name. Invalid submissions are data:
//! the page is re-rendered with the errors and the user's values.
//!
//! Post forms accept `multipart/form-data` (needed for the image) and plain
//! urlencoded bodies for text-only clients.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::{Deserialize, Serialize};

use crate::config::parse_bool;
use crate::services::group::GroupRow;
use crate::services::media::{self, ImageKind, MediaError};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

// =============================================================================
// ERRORS + VIEW
// =============================================================================

/// Field name -> messages. `__all__` holds errors not tied to one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

/// Describes one input the client should render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub widget: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl FormField {
    fn new(name: &'static str, widget: &'static str, required: bool) -> Self {
        Self { name, widget, required, value: None, choices: Vec::new() }
    }

    fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub fields: Vec<FormField>,
    pub errors: FormErrors,
}

impl FormView {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// =============================================================================
// POST FORM
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Bytes,
}

/// Raw post form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFormInput {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<Upload>,
    /// The "clear" checkbox next to an existing image.
    pub clear_image: bool,
}

#[derive(Debug, Default, Deserialize)]
struct UrlencodedPostForm {
    #[serde(default)]
    text: String,
    group: Option<String>,
    #[serde(rename = "image-clear")]
    image_clear: Option<String>,
}

impl From<UrlencodedPostForm> for PostFormInput {
    fn from(form: UrlencodedPostForm) -> Self {
        Self {
            text: form.text,
            group: form.group,
            image: None,
            clear_image: form.image_clear.as_deref().and_then(parse_bool).unwrap_or(false),
        }
    }
}

impl PostFormInput {
    /// Read the known fields of a multipart body. Unknown fields are skipped
    /// and an empty file part counts as no upload.
    ///
    /// # Errors
    ///
    /// Returns the multipart error if the body is malformed.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, axum::extract::multipart::MultipartError> {
        let mut input = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "text" => input.text = field.text().await?,
                "group" => input.group = Some(field.text().await?),
                "image-clear" => input.clear_image = parse_bool(&field.text().await?).unwrap_or(false),
                "image" => {
                    let bytes = field.bytes().await?;
                    if !bytes.is_empty() {
                        input.image = Some(Upload { bytes });
                    }
                }
                _ => {}
            }
        }
        Ok(input)
    }
}

impl<S> FromRequest<S> for PostFormInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Self::from_multipart(multipart)
                .await
                .map_err(IntoResponse::into_response)
        } else {
            let Form(form) = Form::<UrlencodedPostForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(form.into())
        }
    }
}

/// An upload that decoded as one of the allowed formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidImage {
    pub bytes: Bytes,
    pub kind: ImageKind,
}

/// A post form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPostForm {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ValidImage>,
    pub clear_image: bool,
}

/// Validate a post submission against the available groups. The image, if
/// any, is decoded on the blocking pool.
///
/// # Errors
///
/// Returns the collected field errors if any field is invalid.
pub async fn validate_post_form(
    input: &PostFormInput,
    groups: &[GroupRow],
    max_upload_bytes: usize,
) -> Result<ValidPostForm, FormErrors> {
    let mut errors = FormErrors::default();

    let text = input.text.trim();
    if text.is_empty() {
        errors.add("text", REQUIRED);
    }

    let group_id = match input.group.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
            _ => {
                errors.add("group", INVALID_CHOICE);
                None
            }
        },
    };

    let image = match &input.image {
        None => None,
        Some(upload) => match media::check_image(upload.bytes.clone(), max_upload_bytes).await {
            Ok(kind) => Some(ValidImage { bytes: upload.bytes.clone(), kind }),
            Err(e) => {
                if let MediaError::Task(join) = &e {
                    tracing::error!(error = %join, "image check task failed");
                }
                errors.add("image", e.to_string());
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidPostForm { text: text.to_owned(), group_id, image, clear_image: input.clear_image })
}

/// Current values shown in a post form.
#[derive(Debug, Clone, Default)]
pub struct PostFormValues {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image_url: Option<String>,
}

impl From<&PostFormInput> for PostFormValues {
    fn from(input: &PostFormInput) -> Self {
        Self { text: Some(input.text.clone()), group: input.group.clone(), image_url: None }
    }
}

#[must_use]
pub fn post_form_view(groups: &[GroupRow], values: PostFormValues, errors: FormErrors) -> FormView {
    let mut group = FormField::new("group", "select", false).with_value(values.group);
    group.choices = std::iter::once(Choice { value: String::new(), label: "---------".into() })
        .chain(groups.iter().map(|g| Choice { value: g.id.to_string(), label: g.to_string() }))
        .collect();

    FormView {
        fields: vec![
            FormField::new("text", "textarea", true).with_value(values.text),
            group,
            FormField::new("image", "file", false).with_value(values.image_url),
        ],
        errors,
    }
}

// =============================================================================
// COMMENT FORM
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// Trimmed comment text, or the field error.
    ///
    /// # Errors
    ///
    /// Returns a `text` error when the comment is blank.
    pub fn validate(&self) -> Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(FormErrors::single("text", REQUIRED));
        }
        Ok(text.to_owned())
    }
}

#[must_use]
pub fn comment_form_view() -> FormView {
    FormView { fields: vec![FormField::new("text", "textarea", true)], errors: FormErrors::default() }
}

// =============================================================================
// ACCOUNT FORMS
// =============================================================================

/// Body of both the login and the signup form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[must_use]
pub fn credentials_form_view(username: Option<String>, errors: FormErrors) -> FormView {
    FormView {
        fields: vec![
            FormField::new("username", "text", true).with_value(username),
            FormField::new("password", "password", true),
        ],
        errors,
    }
}

/// Only same-site absolute paths are honored as post-login targets.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_owned(),
        _ => "/".to_owned(),
    }
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
