use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use axum::async_trait;
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashConfig;

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Derives a hash under a freshly generated salt.
    async fn hash(&self, plain: &str) -> anyhow::Result<String>;
    async fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn from_config(cfg: &HashConfig) -> anyhow::Result<Self> {
        let defaults = Params::default();
        let params = Params::new(
            cfg.memory_kib.unwrap_or(defaults.m_cost()),
            cfg.iterations.unwrap_or(defaults.t_cost()),
            defaults.p_cost(),
            None,
        )
        .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self::new(params))
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

pub fn hash_password(argon2: &Argon2<'_>, plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(argon2: &Argon2<'_>, plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(argon2.verify_password(plain.as_bytes(), &parsed).is_ok())
}

#[async_trait]
impl PasswordHasher for Argon2Hasher {
    async fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let argon2 = self.argon2();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hash_password(&argon2, &plain)).await?
    }

    async fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let argon2 = self.argon2();
        let (plain, hash) = (plain.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || verify_password(&argon2, &plain, &hash)).await?
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::new(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_roundtrip() {
        let hasher = cheap_hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = hasher.hash(password).await.expect("hashing should succeed");
        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify(password, &hash).await.expect("verify should succeed"));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let hasher = cheap_hasher();
        let hash = hasher.hash("correct-horse").await.expect("hashing should succeed");
        assert!(!hasher
            .verify("wrong-password", &hash)
            .await
            .expect("verify should not error"));
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let hasher = cheap_hasher();
        let a = hasher.hash("secret").await.unwrap();
        let b = hasher.hash("secret").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn verify_errors_on_malformed_hash() {
        let err = cheap_hasher()
            .verify("anything", "not-a-valid-hash")
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn config_overrides_cost() {
        let hasher = Argon2Hasher::from_config(&HashConfig {
            memory_kib: Some(Params::MIN_M_COST),
            iterations: Some(1),
        })
        .unwrap();
        assert_eq!(hasher.params.m_cost(), Params::MIN_M_COST);
        assert_eq!(hasher.params.t_cost(), 1);
    }
}
