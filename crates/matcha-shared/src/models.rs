//! Request and response bodies for the endpoints consumed outside the
//! session core: profile edits, chat, date proposals, browsing and
//! other users' profiles.
//!
//! Request types validate themselves with the same rules the backend
//! applies, so the view layer gets a typed error without a round trip.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    MAX_AGE, MAX_BROWSE_PAGE, MAX_DATE_ACTIVITY_LENGTH, MAX_DATE_LOCATION_LENGTH,
    MAX_MESSAGE_LENGTH, MAX_TAG_LENGTH, MIN_AGE,
};
use crate::error::ValidationError;
use crate::profile::{Location, ProfileImage, Tag};
use crate::types::{Gender, MessageId, ProposalId, SexualPreference, TagId, UserId};

// ---------------------------------------------------------------------------
// Profile edits
// ---------------------------------------------------------------------------

/// Partial update for `profile/update`. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub sexual_preference: Option<SexualPreference>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
}

impl ProfileUpdate {
    /// Validate against `today` and build the JSON body.
    pub fn to_body(&self, today: NaiveDate) -> Result<Value, ValidationError> {
        let mut body = Map::new();

        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if let Some(v) = value {
                let v = v.trim();
                if v.is_empty() {
                    return Err(ValidationError::Empty { field });
                }
                body.insert(field.into(), Value::String(v.to_string()));
            }
        }

        if let Some(email) = &self.email {
            let email = email.trim().to_lowercase();
            if !looks_like_email(&email) {
                return Err(ValidationError::InvalidEmail);
            }
            body.insert("email".into(), Value::String(email));
        }

        if let Some(bio) = &self.bio {
            body.insert("bio".into(), Value::String(bio.trim().to_string()));
        }
        if let Some(gender) = self.gender {
            body.insert("gender".into(), Value::String(gender.as_str().into()));
        }
        if let Some(pref) = self.sexual_preference {
            body.insert(
                "sexual_preference".into(),
                Value::String(pref.as_str().into()),
            );
        }

        if let Some(dob) = &self.date_of_birth {
            let date = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d")
                .map_err(|_| ValidationError::InvalidDate(dob.clone()))?;
            let age = age_on(date, today);
            if !(MIN_AGE..=MAX_AGE).contains(&age) {
                return Err(ValidationError::AgeOutOfRange(age));
            }
            body.insert(
                "date_of_birth".into(),
                Value::String(date.format("%Y-%m-%d").to_string()),
            );
        }

        if body.is_empty() {
            return Err(ValidationError::NoChanges);
        }
        Ok(Value::Object(body))
    }
}

/// Completed years between `dob` and `today`; zero for future dates.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(dob).unwrap_or(0)
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty()
        && !host.is_empty()
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && !s.chars().any(char::is_whitespace)
}

/// Validate a coordinate pair for `profile/location`.
pub fn validate_location(latitude: f64, longitude: f64) -> Result<Location, ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::InvalidCoordinates {
            latitude,
            longitude,
        });
    }
    Ok(Location {
        latitude: Some(latitude),
        longitude: Some(longitude),
    })
}

/// Normalize tags the way the backend stores them: trimmed, `#`-prefixed,
/// lowercase, deduplicated. Blank entries are dropped.
pub fn normalize_tags<I, S>(tags: I) -> Result<Vec<String>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in tags {
        let tag = raw.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        let tag = if tag.starts_with('#') {
            tag.to_lowercase()
        } else {
            format!("#{}", tag.to_lowercase())
        };
        let len = tag.chars().count();
        if len > MAX_TAG_LENGTH {
            return Err(ValidationError::TooLong {
                field: "tag",
                len,
                max: MAX_TAG_LENGTH,
            });
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    if out.is_empty() {
        return Err(ValidationError::Empty { field: "tags" });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationPeer {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_mine: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub user: ConversationPeer,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_mine: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of message history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub has_more: bool,
}

/// Trimmed, bounded chat message content.
pub fn validate_message(content: &str) -> Result<String, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::Empty { field: "message" });
    }
    let len = content.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "message",
            len,
            max: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(content.to_string())
}

// ---------------------------------------------------------------------------
// Date proposals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateProposal {
    pub id: ProposalId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(default, with = "crate::timestamp::option")]
    pub date_time: Option<DateTime<Utc>>,
    pub location: String,
    pub activity: String,
    pub status: DateStatus,
    #[serde(default)]
    pub is_mine: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateProposalRequest {
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub activity: String,
}

impl DateProposalRequest {
    pub fn to_body(&self, now: DateTime<Utc>) -> Result<Value, ValidationError> {
        if self.date_time <= now {
            return Err(ValidationError::DateInPast);
        }
        let location = bounded("location", &self.location, MAX_DATE_LOCATION_LENGTH)?;
        let activity = bounded("activity", &self.activity, MAX_DATE_ACTIVITY_LENGTH)?;
        Ok(serde_json::json!({
            "date_time": self.date_time.to_rfc3339(),
            "location": location,
            "activity": activity,
        }))
    }
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, len, max });
    }
    Ok(value.to_string())
}

/// Answer to a pending proposal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateResponse {
    Accepted,
    Declined,
}

// ---------------------------------------------------------------------------
// Browsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseSort {
    Distance,
    Age,
    FameRating,
    CommonTags,
}

impl BrowseSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Age => "age",
            Self::FameRating => "fame_rating",
            Self::CommonTags => "common_tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Gender filter; its presence switches the backend into search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderFilter {
    Only(Gender),
    All,
}

/// Filters for the suggestion feed. Every `Some` field becomes one query
/// string pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseQuery {
    pub gender: Option<GenderFilter>,
    pub sort: Option<BrowseSort>,
    pub order: Option<SortOrder>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub max_distance_km: Option<u32>,
    pub min_fame: Option<f64>,
    pub max_fame: Option<f64>,
    pub tags: Vec<TagId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl BrowseQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| q.push((k.to_string(), v));

        match self.gender {
            Some(GenderFilter::Only(g)) => push("gender", g.as_str().to_string()),
            Some(GenderFilter::All) => push("gender", "all".to_string()),
            None => {}
        }
        if let Some(sort) = self.sort {
            push("sort", sort.as_str().to_string());
        }
        if let Some(order) = self.order {
            let order = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            push("order", order.to_string());
        }
        if let Some(v) = self.min_age {
            push("min_age", v.to_string());
        }
        if let Some(v) = self.max_age {
            push("max_age", v.to_string());
        }
        if let Some(v) = self.max_distance_km {
            push("max_distance", v.to_string());
        }
        if let Some(v) = self.min_fame {
            push("min_fame", v.to_string());
        }
        if let Some(v) = self.max_fame {
            push("max_fame", v.to_string());
        }
        if !self.tags.is_empty() {
            let joined = self
                .tags
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",");
            push("tags", joined);
        }
        if let Some(v) = self.page {
            push("page", v.max(1).to_string());
        }
        if let Some(v) = self.limit {
            push("limit", v.clamp(1, MAX_BROWSE_PAGE).to_string());
        }
        q
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub fame_rating: f64,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub common_tags_count: u32,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowseResult {
    pub users: Vec<SuggestedUser>,
    pub pagination: Pagination,
    #[serde(default)]
    pub mode: Option<String>,
}

// ---------------------------------------------------------------------------
// Other users' profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfileView {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub sexual_preference: Option<SexualPreference>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub fame_rating: f64,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub last_online: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<ProfileImage>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub liked_by_them: bool,
    #[serde(default)]
    pub connected: bool,
}
