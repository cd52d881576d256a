use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);

/// Opaque series identifier. Server ids arrive as numbers or strings and are
/// normalised to their string form. Placeholders are flagged when minted, so
/// no server id is ever taken for one; the flag does not survive serde.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SeriesId {
    value: String,
    placeholder: bool,
}

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            value: id.into(),
            placeholder: false,
        }
    }

    /// Fresh identifier for records that never touch the server.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Stand-in for a record the server returned without an id. Never valid
    /// as a request target.
    pub fn placeholder() -> Self {
        Self {
            value: format!("temp-{}", Uuid::new_v4()),
            placeholder: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<String> for SeriesId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<SeriesId> for String {
    fn from(id: SeriesId) -> Self {
        id.value
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WatchStatus {
    #[default]
    Watching,
    Watched,
    #[serde(rename = "Plan to Watch")]
    PlanToWatch,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 3] = [Self::Watching, Self::Watched, Self::PlanToWatch];

    /// Display vocabulary.
    pub fn label(self) -> &'static str {
        match self {
            Self::Watching => "Watching",
            Self::Watched => "Watched",
            Self::PlanToWatch => "Plan to Watch",
        }
    }

    /// Wire vocabulary.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Watching => "WATCHING",
            Self::Watched => "WATCHED",
            Self::PlanToWatch => "PLAN_TO_WATCH",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == label)
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.wire_name() == name)
    }

    pub fn allows_rating(self) -> bool {
        self == Self::Watched
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WatchStatus {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Some(status) = Self::from_label(trimmed).or_else(|| Self::from_wire_name(trimmed)) {
            return Ok(status);
        }
        let normalized = trimmed.to_ascii_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "watching" => Ok(Self::Watching),
            "watched" => Ok(Self::Watched),
            "plantowatch" | "plan" => Ok(Self::PlanToWatch),
            _ => Err(DomainError::UnknownStatus(raw.to_string())),
        }
    }
}

/// A 1..=10 score. Only meaningful for series marked as watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self, DomainError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::RatingOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(value: Rating) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    Status,
    Title,
    CreatedAt,
    Genre,
    Rating,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        Self::Status,
        Self::Title,
        Self::CreatedAt,
        Self::Genre,
        Self::Rating,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Title => "title",
            Self::CreatedAt => "createdAt",
            Self::Genre => "genre",
            Self::Rating => "rating",
        }
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|field| field.as_param().to_ascii_lowercase() == lowered)
            .ok_or_else(|| DomainError::UnknownSortField(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(DomainError::UnknownSortDirection(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(WatchStatus),
}

impl StatusFilter {
    /// Value of the `status` query parameter; `all` is sent empty.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::All => "",
            Self::Only(status) => status.wire_name(),
        }
    }

    pub fn matches(self, status: WatchStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed.parse().map(Self::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(DomainError::UnknownTheme(raw.to_string())),
        }
    }
}
