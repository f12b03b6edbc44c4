use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Furniture {
    pub id: i64,
    pub name: String,
    pub photo_url: Option<String>,
}

impl Furniture {
    pub async fn create(db: &SqlitePool, name: &str) -> sqlx::Result<Furniture> {
        sqlx::query_as::<_, Furniture>(
            r#"
            INSERT INTO furniture (name, photo_url)
            VALUES (?, NULL)
            RETURNING id, name, photo_url
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> sqlx::Result<Option<Furniture>> {
        sqlx::query_as::<_, Furniture>(
            r#"
            SELECT id, name, photo_url
            FROM furniture
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// All items in insertion order.
    pub async fn list(db: &SqlitePool) -> sqlx::Result<Vec<Furniture>> {
        sqlx::query_as::<_, Furniture>(
            r#"
            SELECT id, name, photo_url
            FROM furniture
            ORDER BY id ASC
            "#,
        )
        .fetch_all(db)
        .await
    }

    pub async fn update_name(
        db: &SqlitePool,
        id: i64,
        name: &str,
    ) -> sqlx::Result<Option<Furniture>> {
        sqlx::query_as::<_, Furniture>(
            r#"
            UPDATE furniture
               SET name = ?
             WHERE id = ?
            RETURNING id, name, photo_url
            "#,
        )
        .bind(name)
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn set_photo(
        db: &SqlitePool,
        id: i64,
        photo_url: &str,
    ) -> sqlx::Result<Option<Furniture>> {
        sqlx::query_as::<_, Furniture>(
            r#"
            UPDATE furniture
               SET photo_url = ?
             WHERE id = ?
            RETURNING id, name, photo_url
            "#,
        )
        .bind(photo_url)
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Returns `false` when no row had that id.
    pub async fn delete(db: &SqlitePool, id: i64) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM furniture WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
