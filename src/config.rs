use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// Argon2 cost parameters; `None` keeps the library default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub enum StorageBackend {
    Local {
        dir: String,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Prefix joined with a stored filename to form the public image URL.
    pub file_path: String,
    pub backend: StorageBackend,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub uploads: UploadConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY must be set")?,
        };
        let hash = HashConfig {
            memory_kib: parse_var("ARGON2_MEMORY_KIB"),
            iterations: parse_var("ARGON2_ITERATIONS"),
        };

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "local" => StorageBackend::Local {
                dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            },
            "s3" => StorageBackend::S3 {
                endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT must be set")?,
                bucket: std::env::var("S3_BUCKET").context("S3_BUCKET must be set")?,
                access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY must be set")?,
                secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY must be set")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
        };
        let uploads = UploadConfig {
            file_path: std::env::var("FILE_PATH")
                .unwrap_or_else(|_| "http://localhost:5000/uploads/".into()),
            backend,
            max_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(10 * 1024 * 1024),
        };

        Ok(Self {
            database_url,
            jwt,
            hash,
            uploads,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
