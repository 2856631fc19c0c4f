use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            CheckAuthResponse, LoginResponse, ProfileResponse, RegisterResponse,
            UpdateProfileResponse,
        },
        jwt::AuthUser,
        services::AuthController,
    },
    errors::ApiError,
    images::services::read_multipart,
    state::AppState,
    validation::object_fields,
};

pub fn auth_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-auth", get(check_auth))
        .route("/user/:id", get(get_profile).patch(update_profile))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip_all)]
pub async fn register(
    State(auth): State<AuthController>,
    mp: Multipart,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (fields, upload) = read_multipart(mp).await?;
    let res = auth.register(fields, upload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip_all)]
pub async fn login(
    State(auth): State<AuthController>,
    Json(body): Json<Value>,
) -> Result<Json<LoginResponse>, ApiError> {
    let fields = object_fields(body)?;
    Ok(Json(auth.login(fields).await?))
}

#[instrument(skip_all)]
pub async fn check_auth(
    State(auth): State<AuthController>,
    AuthUser(claims): AuthUser,
) -> Result<Json<CheckAuthResponse>, ApiError> {
    Ok(Json(auth.check_auth(&claims).await?))
}

#[instrument(skip(auth, mp))]
pub async fn update_profile(
    State(auth): State<AuthController>,
    Path(id): Path<String>,
    mp: Multipart,
) -> Result<(StatusCode, Json<UpdateProfileResponse>), ApiError> {
    let (fields, upload) = read_multipart(mp).await?;
    let res = auth.update_profile(&id, fields, upload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(auth))]
pub async fn get_profile(
    State(auth): State<AuthController>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(auth.get_profile(&id).await?))
}
