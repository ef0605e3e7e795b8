use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{PoliticalAlignment, PollAnswer};

/// Post content limit, in characters.
pub const MAX_POST_CHARS: usize = 280;
/// Poll vote reason limit, in characters.
pub const MAX_REASON_CHARS: usize = 280;
pub const MIN_DISPLAY_NAME_CHARS: usize = 2;
pub const MAX_DISPLAY_NAME_CHARS: usize = 20;
pub const MAX_BIO_CHARS: usize = 500;

// Timestamps go out as RFC3339. The backend writes naive ISO-8601 strings
// (`2024-01-01T00:00:00.000000`), which are read back as UTC.
mod datetime_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match s.parse::<DateTime<Utc>>() {
            Ok(date) => Ok(date),
            Err(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc()),
        }
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(s) if !s.is_empty() => super::parse(&s)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: Uuid,
    pub user_id: String,
    pub display_name: String,
    pub content: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// A post counts as edited once its update stamp moves off its creation stamp.
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

/// The signed-in user's own vote, echoed back with the poll list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVote {
    pub answer: PollAnswer,
    #[serde(default)]
    pub reason: String,
    #[serde(default, with = "datetime_format::option")]
    pub voted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub poll_id: String,
    pub question: String,
    #[serde(default)]
    pub info_text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub user_vote: Option<UserVote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResults {
    #[serde(default)]
    pub poll_id: Option<String>,
    pub total_votes: u32,
    #[serde(default)]
    pub yes_votes: u32,
    #[serde(default)]
    pub no_votes: u32,
    pub yes_percentage: f64,
    pub no_percentage: f64,
}

/// A recorded vote, as returned by the vote endpoint and the vote history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollVote {
    pub poll_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub answer: PollAnswer,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, with = "datetime_format::option")]
    pub voted_at: Option<DateTime<Utc>>,
    /// Only present in the vote history
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub info_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub political_alignment: PoliticalAlignment,
    #[serde(default)]
    pub profile_private: bool,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub updated_at: DateTime<Utc>,
}

/// Search hit. Private profiles come back with everything but the name blanked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_private: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchProfilesResponse {
    #[serde(default)]
    pub profiles: Vec<ProfileSummary>,
    #[serde(default)]
    pub count: Option<usize>,
}

// Request/Response types for API
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VotePollRequest {
    pub answer: PollAnswer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    pub bio: String,
    pub political_alignment: PoliticalAlignment,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(alias = "message")]
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}
