use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mediadesk_shared::content::PendingFile;
use mediadesk_shared::error::ContentError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::content;
use crate::image_info::{thumbnail, thumbnail_variant, MAX_THUMBNAIL_WIDTH};
use crate::workflow::{CategoryOption, EditWorkflowState, Outcome};
use crate::SharedState;

pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: String) -> Self {
        WebError { status, message }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        let mut response = axum::response::Response::new(body.to_string().into());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<ContentError> for WebError {
    fn from(err: ContentError) -> Self {
        let status = match err {
            ContentError::NotFound(_) => StatusCode::NOT_FOUND,
            ContentError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        WebError {
            status,
            message: err.to_string(),
        }
    }
}

/// What the edit screen needs for one content record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentEditView {
    pub content: content::Model,
    pub content_categories: Vec<Uuid>,
    #[serde(default)]
    pub categories: Vec<CategoryOption>,
    /// Set when the record saved but its file didn't
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ContentEditView {
    fn new(state: EditWorkflowState, outcome: Option<Outcome>) -> Self {
        let warning = match outcome {
            Some(Outcome::BlobFailed(err)) => Some(err.to_string()),
            _ => None,
        };
        Self {
            content: state.content,
            content_categories: state.content_categories,
            categories: state.categories,
            warning,
        }
    }
}

/// The fields of a content form post. Categories always replace the stored
/// set, so a form with no `category` fields clears them.
#[derive(Debug, Default)]
pub struct ContentForm {
    pub file: Option<PendingFile>,
    pub categories: Vec<Uuid>,
    pub name: Option<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_folder: Option<bool>,
}

fn bad_request(message: String) -> WebError {
    WebError::new(StatusCode::BAD_REQUEST, message)
}

/// Empty text means "clear it"
fn optional_text(value: String) -> Option<String> {
    let value = value.trim();
    match value.is_empty() {
        true => None,
        false => Some(value.to_string()),
    }
}

impl ContentForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = ContentForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            error!("Failed to read multipart field: {:?}", e);
            bad_request(format!("Failed to read multipart field: {}", e))
        })? {
            let field_name = field.name().unwrap_or("").to_string();
            debug!("Processing field: {}", field_name);

            if field_name == "file" {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| bad_request("Missing filename in upload".to_string()))?;
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    error!("Failed to read file data: {:?}", e);
                    bad_request(format!("Failed to read file data: {}", e))
                })?;
                debug!("Read {} bytes for {}", data.len(), filename);
                form.file = Some(PendingFile::new(filename, content_type, data.to_vec()));
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| bad_request(format!("Failed to read field {}: {}", field_name, e)))?;

            match field_name.as_str() {
                "category" => {
                    let id = Uuid::parse_str(value.trim())
                        .map_err(|e| bad_request(format!("Invalid category id {:?}: {}", value, e)))?;
                    form.categories.push(id);
                }
                "name" => form.name = Some(value),
                "alt_text" => form.alt_text = Some(value),
                "description" => form.description = Some(value),
                "parent_id" => {
                    form.parent_id = match optional_text(value) {
                        Some(value) => Some(Uuid::parse_str(&value).map_err(|e| {
                            bad_request(format!("Invalid parent id {:?}: {}", value, e))
                        })?),
                        None => None,
                    }
                }
                "is_folder" => {
                    form.is_folder = Some(matches!(value.trim(), "true" | "on" | "1"));
                }
                _ => {
                    debug!("Ignoring unknown multipart field: {}", field_name);
                }
            }
        }

        Ok(form)
    }

    /// Bind the form onto the edit state
    pub fn apply(self, state: &mut EditWorkflowState) {
        if let Some(name) = self.name {
            state.content.name = optional_text(name);
        }
        if let Some(alt_text) = self.alt_text {
            state.content.alt_text = optional_text(alt_text);
        }
        if let Some(description) = self.description {
            state.content.description = optional_text(description);
        }
        if let Some(is_folder) = self.is_folder {
            state.content.is_folder = is_folder;
        }
        if self.parent_id.is_some() {
            state.content.parent_id = self.parent_id;
        }
        state.content_categories = self.categories;
        state.pending_file = self.file;
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/content/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content with its categories", body = ContentEditView),
        (status = 404, description = "No such content"),
    )
)]
pub async fn get_content(
    Path(id): Path<Uuid>,
    State(state): State<SharedState>,
) -> Result<Json<ContentEditView>, WebError> {
    let workflow = state.read().await.workflow.clone();
    let edit = workflow.load_by_id(id).await?;
    Ok(Json(ContentEditView::new(edit, None)))
}

#[utoipa::path(
    post,
    path = "/api/v1/content",
    responses(
        (status = 200, description = "Content created", body = ContentEditView),
        (status = 400, description = "Invalid form"),
    )
)]
pub async fn post_content(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<ContentEditView>, WebError> {
    let form = ContentForm::from_multipart(multipart).await?;
    let workflow = state.read().await.workflow.clone();

    let mut edit = workflow.create_new().await?;
    form.apply(&mut edit);
    if edit.pending_file.is_none() && !edit.content.is_folder {
        return Err(bad_request(
            "Content needs either a file or to be a folder".to_string(),
        ));
    }
    let outcome = workflow.save(&mut edit).await?;
    debug!("Created content {}", edit.content.id);

    Ok(Json(ContentEditView::new(edit, Some(outcome))))
}

#[utoipa::path(
    put,
    path = "/api/v1/content/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content updated", body = ContentEditView),
        (status = 404, description = "No such content"),
    )
)]
pub async fn update_content(
    Path(id): Path<Uuid>,
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<ContentEditView>, WebError> {
    let form = ContentForm::from_multipart(multipart).await?;
    let workflow = state.read().await.workflow.clone();

    let mut edit = workflow.load_by_id(id).await?;
    form.apply(&mut edit);
    let outcome = workflow.save(&mut edit).await?;
    debug!("Updated content {}", id);

    Ok(Json(ContentEditView::new(edit, Some(outcome))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/content/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content deleted"),
        (status = 404, description = "No such content"),
    )
)]
pub async fn delete_content(
    Path(id): Path<Uuid>,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, WebError> {
    let workflow = state.read().await.workflow.clone();
    let edit = workflow.load_by_id(id).await?;

    let body = match workflow.delete(&edit).await? {
        Outcome::Complete => serde_json::json!({ "deleted": id }),
        Outcome::BlobFailed(err) => serde_json::json!({
            "deleted": id,
            "warning": err.to_string(),
        }),
    };
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/v1/content/{id}/file",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "The stored file"),
        (status = 404, description = "No such content or no file"),
    )
)]
pub async fn download_content(
    Path(id): Path<Uuid>,
    State(state): State<SharedState>,
) -> Result<Response, WebError> {
    let workflow = state.read().await.workflow.clone();
    let edit = workflow.load_by_id(id).await?;
    let blobs = workflow.blobs();
    let data = blobs.read(&blobs.path_for(id)).await?;

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, edit.content.content_type.clone()),
            (
                CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    edit.content.filename.replace('"', "")
                ),
            ),
        ],
        data,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/content/{id}/thumbnail/{width}",
    params(
        ("id" = Uuid, Path, description = "Content id"),
        ("width" = u32, Path, description = "Thumbnail width in pixels"),
    ),
    responses(
        (status = 200, description = "JPEG thumbnail"),
        (status = 400, description = "Content isn't an image"),
        (status = 404, description = "No such content"),
    )
)]
pub async fn get_thumbnail(
    Path((id, width)): Path<(Uuid, u32)>,
    State(state): State<SharedState>,
) -> Result<Response, WebError> {
    let workflow = state.read().await.workflow.clone();
    let edit = workflow.load_by_id(id).await?;
    if !edit.content.is_image {
        return Err(bad_request(format!("Content {} is not an image", id)));
    }

    let width = width.clamp(1, MAX_THUMBNAIL_WIDTH);
    let blobs = workflow.blobs();
    let path = blobs.path_for(id);
    let variant = thumbnail_variant(width);

    let data = match blobs.read_derived(&path, &variant).await? {
        Some(cached) => {
            debug!("Thumbnail cache hit for {} at {}px", id, width);
            cached
        }
        None => {
            let original = blobs.read(&path).await?;
            let resized = tokio::task::spawn_blocking(move || thumbnail(&original, width))
                .await
                .map_err(|err| {
                    WebError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Thumbnail task failed: {}", err),
                    )
                })??;
            blobs.write_derived(&path, &variant, &resized).await?;
            resized
        }
    };

    Ok((StatusCode::OK, [(CONTENT_TYPE, "image/jpeg")], data).into_response())
}
