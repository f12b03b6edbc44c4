use crate::auth::jwt::TokenService;
use crate::config::AppConfig;
use crate::db;
use crate::storage::{LocalDiskStorage, PhotoStorage};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn PhotoStorage>,
    pub tokens: TokenService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;

        let disk = LocalDiskStorage::new(config.upload_dir());
        disk.ensure_dir().await?;
        let storage = Arc::new(disk) as Arc<dyn PhotoStorage>;

        Ok(Self::from_parts(db, config, storage))
    }

    pub fn from_parts(
        db: SqlitePool,
        config: Arc<AppConfig>,
        storage: Arc<dyn PhotoStorage>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt);
        Self {
            db,
            config,
            storage,
            tokens,
        }
    }

    /// In-memory database plus a throwaway upload directory. Keep the
    /// returned `TempDir` alive for as long as the state is used.
    #[cfg(test)]
    pub async fn fake() -> (Self, tempfile::TempDir) {
        use crate::config::JwtConfig;
        use jsonwebtoken::Algorithm;

        let tmp = tempfile::TempDir::new().expect("tempdir");
        let db = db::memory_pool().await.expect("in-memory pool");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            static_dir: tmp.path().to_path_buf(),
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            jwt: JwtConfig {
                secret: "test".into(),
                algorithm: Algorithm::HS256,
                ttl_minutes: 5,
            },
        });

        let disk = LocalDiskStorage::new(config.upload_dir());
        disk.ensure_dir().await.expect("upload dir");
        let storage = Arc::new(disk) as Arc<dyn PhotoStorage>;

        (Self::from_parts(db, config, storage), tmp)
    }
}
