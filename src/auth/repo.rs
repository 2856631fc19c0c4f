use std::{collections::BTreeMap, sync::Arc};

use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::auth::repo_types::{User, UserFields, UserId};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, fields: UserFields) -> anyhow::Result<User>;
    /// First user with exactly this email, if any.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>>;
    /// Overwrites every column of the row; returns the number of rows touched.
    async fn update(&self, id: UserId, fields: UserFields) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, fields: UserFields) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, phone, address, image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, password, phone, address, image, created_at, updated_at
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.password_hash)
        .bind(fields.phone)
        .bind(&fields.address)
        .bind(&fields.image)
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, phone, address, image, created_at, updated_at
            FROM users
            WHERE email = $1
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, phone, address, image, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn update(&self, id: UserId, fields: UserFields) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET name = $1, email = $2, password = $3, phone = $4,
                   address = $5, image = $6, updated_at = now()
             WHERE id = $7
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.email)
        .bind(&fields.password_hash)
        .bind(fields.phone)
        .bind(&fields.address)
        .bind(&fields.image)
        .bind(id)
        .execute(&self.db)
        .await
        .context("update user")?;
        Ok(result.rows_affected())
    }
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<RwLock<BTreeMap<UserId, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, fields: UserFields) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let now = OffsetDateTime::now_utc();
        let user = User {
            id,
            name: fields.name,
            email: fields.email,
            password: fields.password_hash,
            phone: fields.phone,
            address: fields.address,
            image: fields.image,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn update(&self, id: UserId, fields: UserFields) -> anyhow::Result<u64> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(0);
        };
        user.name = fields.name;
        user.email = fields.email;
        user.password = fields.password_hash;
        user.phone = fields.phone;
        user.address = fields.address;
        user.image = fields.image;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(1)
    }
}
