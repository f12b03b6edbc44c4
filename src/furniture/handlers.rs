use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::{FormRejection, PathRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::instrument;

use super::{
    dto::{Deleted, FurnitureOut, NameForm},
    services,
};
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    photos::services::{PhotoUpload, MAX_PHOTO_BYTES},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct PhotoUploaded {
    pub message: String,
    pub photo_url: String,
}

pub fn furniture_routes() -> Router<AppState> {
    Router::new()
        .route("/furniture", get(list_furniture).post(create_furniture))
        .route("/furniture/", get(list_furniture).post(create_furniture))
        .route(
            "/furniture/:id",
            get(get_furniture)
                .put(update_furniture)
                .delete(delete_furniture),
        )
}

/// Photo uploads enforce their own size cap while streaming.
pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/furniture/:id/photo", post(upload_photo))
        .layer(DefaultBodyLimit::disable())
}

#[instrument(skip(state, form))]
pub async fn create_furniture(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    form: Result<Form<NameForm>, FormRejection>,
) -> Result<(StatusCode, HeaderMap, Json<FurnitureOut>), AppError> {
    let Form(form) = form?;
    let item = services::create_item(&state.db, &form.name).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/furniture/{}", item.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(item.into())))
}

#[instrument(skip(state))]
pub async fn list_furniture(
    State(state): State<AppState>,
) -> Result<Json<Vec<FurnitureOut>>, AppError> {
    let items = services::list_items(&state.db).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_furniture(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<FurnitureOut>, AppError> {
    let Path(id) = id?;
    let item = services::get_item(&state.db, id).await?;
    Ok(Json(item.into()))
}

#[instrument(skip(state, form))]
pub async fn update_furniture(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    form: Result<Form<NameForm>, FormRejection>,
) -> Result<Json<FurnitureOut>, AppError> {
    let Path(id) = id?;
    let Form(form) = form?;
    let item = services::update_item(&state.db, id, &form.name).await?;
    Ok(Json(item.into()))
}

#[instrument(skip(state))]
pub async fn delete_furniture(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Deleted>, AppError> {
    let Path(id) = id?;
    services::delete_item(&state, id).await?;
    Ok(Json(Deleted {
        detail: "Deleted".into(),
    }))
}

/// POST /furniture/:id/photo (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<PhotoUploaded>, AppError> {
    let Path(id) = id?;
    let mut mp = mp?;
    while let Some(mut field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::Validation("uploaded file has no file name".into()))?;
        let data = read_capped(&mut field, MAX_PHOTO_BYTES).await?;

        let photo_url =
            services::upload_photo(&state, id, PhotoUpload { filename, data }).await?;
        return Ok(Json(PhotoUploaded {
            message: "Photo uploaded".into(),
            photo_url,
        }));
    }

    Err(AppError::Validation("multipart field `file` is required".into()))
}

/// Reads a multipart field but stops once `limit + 1` bytes are buffered,
/// which is enough for the upload check to reject it as too large.
async fn read_capped(field: &mut Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let room = limit + 1 - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
