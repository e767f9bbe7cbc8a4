use axum::{
    body::Body,
    extract::{Multipart, Path, Request, State},
    response::Response,
    Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;
use utoipa::ToSchema;

use super::found;
use crate::auth::{gate, Action, Actor, ActorKind};
use crate::errors::ServiceError;
use crate::services::images::ImageKind;
use crate::{ApiResponse, ApiResult, AppState};

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageStatus {
    pub kind: ImageKind,
    pub id: i32,
    pub has_image: bool,
}

/// Loads the entity the image belongs to and checks `action` against it.
async fn authorize_image(
    state: &AppState,
    actor: &Actor,
    kind: ImageKind,
    id: i32,
    action: Action,
) -> Result<(), ServiceError> {
    let account_kind = match kind {
        ImageKind::Substances => {
            let substance = found(state.services.substances.get(id).await?, "Substance", id)?;
            return gate(actor, kind.resource(), action, Some(&substance));
        }
        ImageKind::Customers => ActorKind::Customer,
        ImageKind::Dealers => ActorKind::Dealer,
        ImageKind::Providers => ActorKind::Provider,
    };
    let account = found(
        state.services.accounts.get(account_kind, id).await?,
        kind.dir_name(),
        id,
    )?;
    gate(actor, kind.resource(), action, Some(&account))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ServiceError {
    ServiceError::InvalidInput(format!("malformed upload: {}", err.body_text()))
}

/// Replaces the entity's image with the multipart `file` field.
pub async fn upload_image(
    State(state): State<AppState>,
    actor: Actor,
    Path((kind, id)): Path<(ImageKind, i32)>,
    mut multipart: Multipart,
) -> ApiResult<ImageStatus> {
    authorize_image(&state, &actor, kind, id, Action::UploadImage).await?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::InvalidInput("upload has no file name".to_string()))?;
        let bytes = field.bytes().await.map_err(multipart_error)?;
        state
            .services
            .images
            .save(kind, id, &file_name, &bytes)
            .await?;
        info!(?kind, id, actor_id = actor.id, "Image uploaded");
        return Ok(Json(
            ApiResponse::success(ImageStatus {
                kind,
                id,
                has_image: true,
            })
            .with_message("image stored"),
        ));
    }

    Err(ServiceError::InvalidInput(format!(
        "multipart field `{}` is required",
        FILE_FIELD
    )))
}

/// Serves the stored file; the content type follows its extension.
pub async fn get_image(
    State(state): State<AppState>,
    actor: Actor,
    Path((kind, id)): Path<(ImageKind, i32)>,
    request: Request,
) -> Result<Response, ServiceError> {
    authorize_image(&state, &actor, kind, id, Action::Read).await?;
    let path = state
        .services
        .images
        .find(kind, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} has no image", kind.dir_name(), id)))?;

    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new))
}

pub async fn image_exists(
    State(state): State<AppState>,
    actor: Actor,
    Path((kind, id)): Path<(ImageKind, i32)>,
) -> ApiResult<ImageStatus> {
    authorize_image(&state, &actor, kind, id, Action::Read).await?;
    let has_image = state.services.images.exists(kind, id).await?;
    Ok(Json(ApiResponse::success(ImageStatus { kind, id, has_image })))
}
