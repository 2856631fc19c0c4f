use serde::Serialize;

use super::repo_types::{User, UserId};
use crate::validation::{Rule, Schema};

/// Accepted text fields of the register form; the image travels separately.
pub const REGISTER_SCHEMA: Schema = Schema {
    keys: &[
        ("name", Rule::string_min(3)),
        ("email", Rule::email_min(5)),
        ("password", Rule::string_min(3)),
        ("phone", Rule::number_min(9.0)),
        ("address", Rule::string()),
    ],
};

pub const LOGIN_SCHEMA: Schema = Schema {
    keys: &[
        ("email", Rule::email_min(5)),
        ("password", Rule::string_min(3)),
    ],
};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub message: String,
    pub data: RegisterData,
}

#[derive(Debug, Serialize)]
pub struct RegisterData {
    #[serde(rename = "newUser")]
    pub new_user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: String,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub status: &'static str,
    pub message: String,
    pub user: SessionUser,
}

/// Signed-in user as returned by check-auth; `image` is a full URL.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: i64,
    pub address: String,
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "updateUser")]
    pub update_user: UpdatedUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UpdatedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: i64,
    pub address: String,
    pub image: String,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub user: Option<PublicProfile>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PublicProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: i64,
    pub address: String,
}

impl From<User> for PublicProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            address: u.address,
        }
    }
}
