//! Account controller: register, login, session check and profile read/update.
//!
//! Each operation validates its input, talks to the user store, hashes and
//! signs where it mutates, and assembles the response body. Failures map onto
//! [`ApiError`]: validation and business-rule failures are detected before
//! any write, anything else surfaces as [`ApiError::Unexpected`].

use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::{
    claims::Claims,
    dto::{
        CheckAuthResponse, LoginResponse, ProfileResponse, PublicProfile, RegisterData,
        RegisterResponse, SessionUser, UpdateProfileResponse, UpdatedUser, LOGIN_SCHEMA,
        REGISTER_SCHEMA,
    },
    jwt::TokenIssuer,
    password::PasswordHasher,
    repo::UserStore,
    repo_types::{UserFields, UserId},
};
use crate::{
    config::AppConfig,
    errors::ApiError,
    images::services::{image_url, save_upload, UploadItem},
    state::AppState,
    storage::StorageClient,
    validation::{as_number, Fields},
};

/// Identity signed into tokens issued by register and profile update.
///
/// Those two paths sign the model-level id rather than the affected row's id.
/// It carries no value, so their tokens hold no `id` claim; login signs the
/// real row id.
const MODEL_IDENTITY: Option<UserId> = None;

#[derive(Clone)]
pub struct AuthController {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    storage: Arc<dyn StorageClient>,
    config: Arc<AppConfig>,
}

impl FromRef<AppState> for AuthController {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.hasher.clone(),
            state.tokens.clone(),
            state.storage.clone(),
            state.config.clone(),
        )
    }
}

fn text_field(fields: &Fields, key: &str) -> anyhow::Result<String> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => anyhow::bail!("field {key} is not text: {other}"),
        None => anyhow::bail!("field {key} is missing"),
    }
}

fn integer_field(fields: &Fields, key: &str) -> anyhow::Result<i64> {
    let value = fields
        .get(key)
        .with_context(|| format!("field {key} is missing"))?;
    let n = as_number(value).with_context(|| format!("field {key} is not a number: {value}"))?;
    anyhow::ensure!(
        n.fract() == 0.0 && n.abs() < i64::MAX as f64,
        "field {key} is not an integer: {n}"
    );
    Ok(n as i64)
}

fn parse_id(raw: &str) -> anyhow::Result<UserId> {
    raw.trim()
        .parse::<UserId>()
        .with_context(|| format!("invalid user id {raw:?}"))
}

/// Profile columns shared by register and update, minus the password hash and image.
struct ProfileInput {
    name: String,
    email: String,
    password: String,
    phone: i64,
    address: String,
}

impl ProfileInput {
    fn from_fields(fields: &Fields) -> anyhow::Result<Self> {
        Ok(Self {
            name: text_field(fields, "name")?,
            email: text_field(fields, "email")?,
            password: text_field(fields, "password")?,
            phone: integer_field(fields, "phone")?,
            address: text_field(fields, "address")?,
        })
    }

    fn into_columns(self, password_hash: String, image: String) -> UserFields {
        UserFields {
            name: self.name,
            email: self.email,
            password_hash,
            phone: self.phone,
            address: self.address,
            image,
        }
    }
}

impl AuthController {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        storage: Arc<dyn StorageClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            storage,
            config,
        }
    }

    #[instrument(skip_all)]
    pub async fn register(
        &self,
        fields: Fields,
        upload: Option<UploadItem>,
    ) -> Result<RegisterResponse, ApiError> {
        if let Err(e) = REGISTER_SCHEMA.validate(&fields) {
            warn!(kind = ?e.kind(), reason = %e, "register rejected");
            return Err(e.into());
        }

        let input = ProfileInput::from_fields(&fields)?;
        let upload = upload.context("no image uploaded")?;
        let hash = self.hasher.hash(&input.password).await?;
        let image = save_upload(self.storage.as_ref(), upload).await?;

        let new_user = self.users.create(input.into_columns(hash, image)).await?;
        let token = self.tokens.sign(MODEL_IDENTITY)?;

        info!(user_id = new_user.id, email = %new_user.email, "user registered");
        Ok(RegisterResponse {
            status: "success",
            message: "register success".into(),
            data: RegisterData { new_user, token },
        })
    }

    #[instrument(skip_all)]
    pub async fn login(&self, fields: Fields) -> Result<LoginResponse, ApiError> {
        if let Err(e) = LOGIN_SCHEMA.validate(&fields) {
            warn!(kind = ?e.kind(), reason = %e, "login rejected");
            return Err(e.into());
        }

        let email = text_field(&fields, "email")?;
        let password = text_field(&fields, "password")?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        if !self.hasher.verify(&password, &user.password).await? {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.sign(Some(user.id))?;

        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(LoginResponse {
            status: "success",
            message: "login success".into(),
            username: user.email,
            token,
        })
    }

    #[instrument(skip_all, fields(user_id = ?identity.id))]
    pub async fn check_auth(&self, identity: &Claims) -> Result<CheckAuthResponse, ApiError> {
        let id = identity.id.context("token carries no user id")?;

        let Some(user) = self.users.find_by_id(id).await? else {
            warn!(user_id = id, "check-auth for missing user");
            return Err(ApiError::NotFound);
        };

        Ok(CheckAuthResponse {
            status: "success",
            message: format!("check-auth {id} success"),
            user: SessionUser {
                id: user.id,
                name: user.name,
                email: user.email,
                phone: user.phone,
                address: user.address,
                image: image_url(&self.config.uploads.file_path, &user.image),
            },
        })
    }

    /// Replaces every profile column. The submitted password is always
    /// re-hashed, even when it is a previously returned hash.
    #[instrument(skip(self, fields, upload))]
    pub async fn update_profile(
        &self,
        id: &str,
        fields: Fields,
        upload: Option<UploadItem>,
    ) -> Result<UpdateProfileResponse, ApiError> {
        let id = parse_id(id)?;
        let input = ProfileInput::from_fields(&fields)?;
        let upload = upload.context("no image uploaded")?;
        let hash = self.hasher.hash(&input.password).await?;
        let image = save_upload(self.storage.as_ref(), upload).await?;

        let touched = self.users.update(id, input.into_columns(hash, image)).await?;
        let token = self.tokens.sign(MODEL_IDENTITY)?;
        let user = self
            .users
            .find_by_id(id)
            .await?
            .with_context(|| format!("user {id} missing after update ({touched} rows)"))?;

        info!(user_id = id, "profile updated");
        Ok(UpdateProfileResponse {
            status: "success",
            message: format!("update user {id} success"),
            update_user: UpdatedUser {
                name: user.name,
                email: user.email,
                password: user.password,
                phone: user.phone,
                address: user.address,
                image: image_url(&self.config.uploads.file_path, &user.image),
            },
            token,
        })
    }

    /// Absent users yield a success body with a null user.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, id: &str) -> Result<ProfileResponse, ApiError> {
        let id = parse_id(id)?;
        let user = self.users.find_by_id(id).await?;
        Ok(ProfileResponse {
            status: "success",
            user: user.map(PublicProfile::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::errors::CREDENTIALS_MESSAGE;

    fn controller() -> (AuthController, AppState) {
        let state = AppState::fake();
        (AuthController::from_ref(&state), state)
    }

    fn form(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn ann() -> Fields {
        form(json!({
            "name": "Ann Lee",
            "email": "ann@x.com",
            "password": "secret",
            "phone": "10",
            "address": "1 Rd"
        }))
    }

    fn png(name: &str) -> Option<UploadItem> {
        Some(UploadItem {
            filename: name.into(),
            content_type: "image/png".into(),
            body: Bytes::from_static(b"\x89PNG"),
        })
    }

    #[tokio::test]
    async fn register_stores_hash_and_image_filename() {
        let (auth, state) = controller();
        let res = auth.register(ann(), png("ann.png")).await.unwrap();

        let user = &res.data.new_user;
        assert_eq!(res.status, "success");
        assert_eq!(res.message, "register success");
        assert_eq!(user.image, "ann.png");
        assert_ne!(user.password, "secret");
        assert!(state.hasher.verify("secret", &user.password).await.unwrap());

        let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(&stored, user);
    }

    #[tokio::test]
    async fn register_token_has_no_user_id() {
        let (auth, state) = controller();
        let res = auth.register(ann(), png("ann.png")).await.unwrap();
        let claims = state.tokens.verify(&res.data.token).unwrap();
        assert_eq!(claims.id, None);
    }

    #[tokio::test]
    async fn register_boundaries_fail_without_writes() {
        let (auth, state) = controller();
        let cases = [
            ("name", json!("An"), "string.min"),
            ("email", json!("a@b"), "string.email"),
            ("password", json!("pw"), "string.min"),
            ("phone", json!("8"), "number.min"),
            ("phone", json!("99999999999999999999"), "number.unsafe"),
        ];
        for (key, value, kind) in cases {
            let mut fields = ann();
            fields.insert(key.into(), value);
            match auth.register(fields, png("ann.png")).await {
                Err(ApiError::Validation(e)) => assert_eq!(e.kind(), Some(kind), "{key}"),
                other => panic!("{key}: expected validation error, got {other:?}"),
            }
        }
        assert!(state.users.find_by_email("ann@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_without_image_is_unexpected() {
        let (auth, state) = controller();
        let err = auth.register(ann(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
        assert!(state.users.find_by_email("ann@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_then_login_roundtrip() {
        let (auth, state) = controller();
        let created = auth.register(ann(), png("ann.png")).await.unwrap();

        let res = auth
            .login(form(json!({ "email": "ann@x.com", "password": "secret" })))
            .await
            .unwrap();
        assert_eq!(res.message, "login success");
        assert_eq!(res.username, "ann@x.com");
        let claims = state.tokens.verify(&res.token).unwrap();
        assert_eq!(claims.id, Some(created.data.new_user.id));
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let (auth, _) = controller();
        auth.register(ann(), png("ann.png")).await.unwrap();

        let unknown = auth
            .login(form(json!({ "email": "bob@x.com", "password": "secret" })))
            .await
            .unwrap_err();
        let wrong = auth
            .login(form(json!({ "email": "ann@x.com", "password": "nope!" })))
            .await
            .unwrap_err();
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(CREDENTIALS_MESSAGE, "Email & Password not found");
    }

    #[tokio::test]
    async fn login_rejects_unknown_keys() {
        let (auth, _) = controller();
        let err = auth
            .login(form(json!({ "email": "ann@x.com", "password": "secret", "name": "Ann" })))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(e) => assert_eq!(e.kind(), Some("object.unknown")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_auth_builds_image_url() {
        let (auth, state) = controller();
        let created = auth.register(ann(), png("ann.png")).await.unwrap();
        let id = created.data.new_user.id;

        let res = auth
            .check_auth(&Claims { id: Some(id), iat: 0 })
            .await
            .unwrap();
        assert_eq!(res.message, format!("check-auth {id} success"));
        assert_eq!(res.user.email, "ann@x.com");
        assert_eq!(
            res.user.image,
            format!(
                "{}{}",
                state.config.uploads.file_path, created.data.new_user.image
            )
        );
        let body = serde_json::to_value(&res).unwrap();
        assert!(body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn check_auth_missing_user_is_not_found() {
        let (auth, _) = controller();
        let err = auth
            .check_auth(&Claims { id: Some(404), iat: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        let err = auth.check_auth(&Claims { id: None, iat: 0 }).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn update_profile_overwrites_and_rehashes() {
        let (auth, state) = controller();
        let created = auth.register(ann(), png("ann.png")).await.unwrap();
        let id = created.data.new_user.id.to_string();

        let mut changes = ann();
        changes.insert("name".into(), json!("Ann Smith"));
        let first = auth
            .update_profile(&id, changes.clone(), png("new.png"))
            .await
            .unwrap();
        assert_eq!(first.message, format!("update user {id} success"));
        assert_eq!(first.update_user.name, "Ann Smith");
        assert_eq!(
            first.update_user.image,
            format!("{}new.png", state.config.uploads.file_path)
        );
        assert_ne!(first.update_user.password, created.data.new_user.password);
        assert_eq!(state.tokens.verify(&first.token).unwrap().id, None);

        // resubmitting the returned hash as the password hashes the hash
        changes.insert("password".into(), json!(first.update_user.password.clone()));
        let second = auth
            .update_profile(&id, changes, png("new.png"))
            .await
            .unwrap();
        assert!(state
            .hasher
            .verify(&first.update_user.password, &second.update_user.password)
            .await
            .unwrap());
        assert!(!state
            .hasher
            .verify("secret", &second.update_user.password)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_profile_requires_every_field_and_file() {
        let (auth, _) = controller();
        auth.register(ann(), png("ann.png")).await.unwrap();

        let mut partial = ann();
        partial.remove("address");
        let err = auth.update_profile("1", partial, png("x.png")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));

        let err = auth.update_profile("1", ann(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn update_profile_on_missing_user_is_unexpected() {
        let (auth, _) = controller();
        let err = auth.update_profile("5", ann(), png("x.png")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));

        let err = auth.update_profile("five", ann(), png("x.png")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn get_profile_is_stable_and_hides_secrets() {
        let (auth, _) = controller();
        let created = auth.register(ann(), png("ann.png")).await.unwrap();
        let id = created.data.new_user.id.to_string();

        let a = auth.get_profile(&id).await.unwrap();
        let b = auth.get_profile(&id).await.unwrap();
        assert_eq!(a, b);

        let body = serde_json::to_value(&a).unwrap();
        assert_eq!(body["user"]["email"], "ann@x.com");
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("image").is_none());
        assert!(body["user"].get("createdAt").is_none());
    }

    #[tokio::test]
    async fn get_profile_missing_user_is_null() {
        let (auth, _) = controller();
        let res = auth.get_profile("42").await.unwrap();
        assert_eq!(res.user, None);
        let body = serde_json::to_value(&res).unwrap();
        assert_eq!(body, json!({ "status": "success", "user": null }));
    }

    #[tokio::test]
    async fn get_profile_non_numeric_id_is_unexpected() {
        let (auth, _) = controller();
        let err = auth.get_profile("abc").await.unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }
}
