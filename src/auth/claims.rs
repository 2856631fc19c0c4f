use serde::{Deserialize, Serialize};

use super::repo_types::UserId;

/// JWT payload. The token has no expiry; `id` is omitted when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub iat: i64, // issued at (unix timestamp)
}
