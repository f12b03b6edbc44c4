use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::PHOTO_SUBDIR, error::AppError, furniture::repo::Furniture, state::AppState,
};

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct PhotoUpload {
    pub filename: String,
    pub data: Bytes,
}

/// Validates the upload, stores it under a generated name and links it to
/// the item. Returns the public URL of the stored photo.
///
/// Checks run in order and the first failure wins: the item must exist, the
/// payload must be at most [`MAX_PHOTO_BYTES`], and the file name must end in
/// one of [`ALLOWED_EXTENSIONS`].
pub async fn accept(
    st: &AppState,
    item_id: i64,
    upload: PhotoUpload,
) -> Result<String, AppError> {
    let item = Furniture::find_by_id(&st.db, item_id)
        .await?
        .ok_or(AppError::ItemNotFound)?;

    if upload.data.len() > MAX_PHOTO_BYTES {
        warn!(item_id, bytes = upload.data.len(), "photo too large");
        return Err(AppError::FileTooLarge {
            limit: MAX_PHOTO_BYTES,
        });
    }

    let ext = allowed_extension(&upload.filename).ok_or_else(|| {
        warn!(item_id, filename = %upload.filename, "unsupported photo format");
        AppError::UnsupportedFormat
    })?;

    let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
    let size = upload.data.len();
    st.storage.put(&stored_name, upload.data).await?;

    let url = public_url(&stored_name);
    match Furniture::set_photo(&st.db, item_id, &url).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            discard(st, &stored_name).await;
            return Err(AppError::ItemNotFound);
        }
        Err(e) => {
            discard(st, &stored_name).await;
            return Err(e.into());
        }
    }

    if let Some(previous) = item.photo_url.as_deref().and_then(photo_file_name) {
        if let Err(e) = st.storage.remove(previous).await {
            warn!(item_id, file = previous, error = %e, "could not remove replaced photo");
        }
    }

    info!(item_id, file = %stored_name, bytes = size, "photo stored");
    Ok(url)
}

/// Lower-cased extension after the last `.`, if it is an accepted image type.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn public_url(stored_name: &str) -> String {
    format!("/static/{}/{}", PHOTO_SUBDIR, stored_name)
}

/// Inverse of [`public_url`]; `None` for URLs this service did not produce.
pub fn photo_file_name(url: &str) -> Option<&str> {
    url.strip_prefix("/static/")?
        .strip_prefix(PHOTO_SUBDIR)?
        .strip_prefix('/')
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

async fn discard(st: &AppState, stored_name: &str) {
    if let Err(e) = st.storage.remove(stored_name).await {
        warn!(file = stored_name, error = %e, "could not discard orphaned photo");
    }
}
