use serde::{Deserialize, Serialize};

use super::repo::Furniture;

/// Form body for create and rename.
#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FurnitureOut {
    pub id: i64,
    pub name: String,
    pub photo_url: Option<String>,
}

impl From<Furniture> for FurnitureOut {
    fn from(f: Furniture) -> Self {
        Self {
            id: f.id,
            name: f.name,
            photo_url: f.photo_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub detail: String,
}
