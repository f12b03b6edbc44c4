use crate::auth::repo_types::User;
use sqlx::SqlitePool;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, role
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        db: &SqlitePool,
        email: &str,
        hashed_password: &str,
        role: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password, role)
            VALUES (?, ?, ?)
            RETURNING id, email, hashed_password, role
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .bind(role)
        .fetch_one(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn create_then_find_by_email() {
        let pool = db::memory_pool().await.expect("pool");
        let created = User::create(&pool, "a@b.io", "hash", "user")
            .await
            .expect("create");
        assert_eq!(created.id, 1);

        let found = User::find_by_email(&pool, "a@b.io")
            .await
            .expect("query")
            .expect("present");
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, "user");

        let missing = User::find_by_email(&pool, "nobody@b.io")
            .await
            .expect("query");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn email_is_unique_at_storage() {
        let pool = db::memory_pool().await.expect("pool");
        User::create(&pool, "a@b.io", "h1", "user").await.expect("first");
        let err = User::create(&pool, "a@b.io", "h2", "user")
            .await
            .unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.is_unique_violation());
    }
}
