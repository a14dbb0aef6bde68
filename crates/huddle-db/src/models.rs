use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Category of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    Travel,
    Shop,
    Socialize,
    Business,
}

impl fmt::Display for PlanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Travel => "travel",
            Self::Shop => "shop",
            Self::Socialize => "socialize",
            Self::Business => "business",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanCategory {
    type Err = PlanCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "travel" => Ok(Self::Travel),
            "shop" => Ok(Self::Shop),
            "socialize" => Ok(Self::Socialize),
            "business" => Ok(Self::Business),
            other => Err(PlanCategoryParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanCategory`] string.
#[derive(Debug, Clone)]
pub struct PlanCategoryParseError(pub String);

impl fmt::Display for PlanCategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan category: {:?}", self.0)
    }
}

impl std::error::Error for PlanCategoryParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A registered user.
///
/// The password hash is opaque to everything but the auth helpers and is
/// never serialized into API responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user, as returned by the friends listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FriendProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// A directed friendship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FriendEdge {
    pub user_id: Uuid,
    pub friend_id: Uuid,
}

/// A posted plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub duration: String,
    pub category: PlanCategory,
    pub location: String,
    pub location_lat: f64,
    pub location_lon: f64,
    pub features: String,
    pub invited_friends: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_participants: i32,
    pub current_participants: i32,
    pub posted_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The full set of caller-supplied plan attributes.
///
/// Used for both insert and update: plans only support full-record writes,
/// so every field is required except the optional invited-friends list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub duration: String,
    pub category: PlanCategory,
    pub location: String,
    pub location_lat: f64,
    pub location_lon: f64,
    pub features: String,
    #[serde(default)]
    pub invited_friends: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_participants: i32,
}

/// A login session row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
