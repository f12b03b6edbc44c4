use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    error::AppError,
    furniture::repo::Furniture,
    photos::services::{self as photos, PhotoUpload},
    state::AppState,
};

pub(crate) fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::InvalidName);
    }
    Ok(name.to_string())
}

pub async fn create_item(db: &SqlitePool, name: &str) -> Result<Furniture, AppError> {
    let name = validate_name(name)?;
    let item = Furniture::create(db, &name).await?;
    info!(item_id = item.id, name = %item.name, "item created");
    Ok(item)
}

pub async fn list_items(db: &SqlitePool) -> Result<Vec<Furniture>, AppError> {
    Ok(Furniture::list(db).await?)
}

pub async fn get_item(db: &SqlitePool, id: i64) -> Result<Furniture, AppError> {
    Furniture::find_by_id(db, id)
        .await?
        .ok_or(AppError::ItemNotFound)
}

pub async fn update_item(db: &SqlitePool, id: i64, name: &str) -> Result<Furniture, AppError> {
    let name = validate_name(name)?;
    let item = Furniture::update_name(db, id, &name)
        .await?
        .ok_or(AppError::ItemNotFound)?;
    info!(item_id = item.id, name = %item.name, "item renamed");
    Ok(item)
}

/// Removes the backing photo (tolerating an already missing file), then the row.
pub async fn delete_item(st: &AppState, id: i64) -> Result<(), AppError> {
    let item = Furniture::find_by_id(&st.db, id)
        .await?
        .ok_or(AppError::ItemNotFound)?;

    if let Some(url) = item.photo_url.as_deref() {
        match photos::photo_file_name(url) {
            Some(name) => st.storage.remove(name).await?,
            None => warn!(
                item_id = id,
                photo_url = url,
                "photo url outside upload dir, file left alone"
            ),
        }
    }

    if !Furniture::delete(&st.db, id).await? {
        return Err(AppError::ItemNotFound);
    }
    info!(item_id = id, "item deleted");
    Ok(())
}

pub async fn upload_photo(
    st: &AppState,
    id: i64,
    upload: PhotoUpload,
) -> Result<String, AppError> {
    photos::accept(st, id, upload).await
}
