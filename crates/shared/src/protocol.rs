//! Wire shapes exchanged with the series backend.

use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

use crate::domain::{Role, UserId};

/// Ids come back as JSON numbers from the backend, but older payloads and the
/// local store use strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value,
        }
    }
}

/// Any JSON scalar a loosely typed backend may put in a numeric field.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Whole floats become integers; anything fractional or too large does not.
fn whole_number(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    (value.is_finite() && value.fract() == 0.0 && value.abs() < LIMIT).then_some(value as i64)
}

fn parse_whole(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(whole_number))
}

/// Numbers and strings are kept; other shapes read as a missing id.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<WireId>, D::Error> {
    Ok(match Option::<LooseScalar>::deserialize(deserializer)? {
        Some(LooseScalar::Int(value)) => Some(WireId::Number(value)),
        Some(LooseScalar::Float(value)) => Some(
            whole_number(value)
                .map(WireId::Number)
                .unwrap_or_else(|| WireId::Text(value.to_string())),
        ),
        Some(LooseScalar::Text(value)) => Some(WireId::Text(value)),
        Some(LooseScalar::Other(_)) | None => None,
    })
}

/// `8`, `8.0` and `"8"` all read as 8; anything else reads as no rating.
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<LooseScalar>::deserialize(deserializer)? {
        Some(LooseScalar::Int(value)) => Some(value),
        Some(LooseScalar::Float(value)) => whole_number(value),
        Some(LooseScalar::Text(value)) => parse_whole(&value),
        Some(LooseScalar::Other(_)) | None => None,
    })
}

/// Series as the backend stores it. Every field is optional on the way in,
/// and a malformed id or rating never fails the surrounding page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDto {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<WireId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_link: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /api/series` and `PUT /api/series/{id}`. The id travels in
/// the path, never in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPayload {
    pub title: String,
    pub genre: String,
    pub status: String,
    pub image_link: String,
    pub link: String,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPageResponse {
    #[serde(default)]
    pub series: Vec<SeriesDto>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSeriesQuery {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub sort_direction: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Account as returned by `/api/users/me` and `/api/users/all`, and as kept in
/// the local credential store. A profile decoded from a bearer token has no
/// id or role until the full record is fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Name shown in lists: username, then email, then a generic fallback.
    pub fn display_name(&self) -> &str {
        if !self.username.is_empty() {
            &self.username
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "No Username"
        }
    }
}
