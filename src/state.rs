use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{
    jwt::{JwtKeys, TokenIssuer},
    password::{Argon2Hasher, PasswordHasher},
    repo::{MemoryUserStore, PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::storage::{self, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };

        let hasher = Arc::new(Argon2Hasher::from_config(&config.hash)?);
        let tokens = Arc::new(JwtKeys::new(&config.jwt));
        let storage = storage::connect(&config.uploads.backend).await?;

        Ok(Self {
            config,
            users,
            hasher,
            tokens,
            storage,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{HashConfig, JwtConfig, StorageBackend, UploadConfig};
        use crate::storage::MemoryStorage;

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
            },
            hash: HashConfig::default(),
            uploads: UploadConfig {
                file_path: "http://localhost:5000/uploads/".into(),
                backend: StorageBackend::Local {
                    dir: "uploads".into(),
                },
                max_bytes: 1024 * 1024,
            },
        });

        Self {
            tokens: Arc::new(JwtKeys::new(&config.jwt)),
            config,
            users: Arc::new(MemoryUserStore::new()),
            hasher: Arc::new(crate::auth::password::cheap_hasher()),
            storage: Arc::new(MemoryStorage::default()),
        }
    }
}
