use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NotificationId, UserId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Visit,
    Message,
    Match,
    Unlike,
    DateProposal,
}

/// The user who triggered a notification. Every field is nullable because
/// the backend resolves it with a left join.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceUser {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub from_user: Option<SourceUser>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Human-readable line for the notification list.
    pub fn describe(&self) -> String {
        let name = self
            .from_user
            .as_ref()
            .and_then(|u| u.first_name.as_deref().or(u.username.as_deref()))
            .unwrap_or("Someone");
        match self.kind {
            NotificationKind::Like => format!("{name} liked your profile"),
            NotificationKind::Visit => format!("{name} visited your profile"),
            NotificationKind::Message => format!("{name} sent you a message"),
            NotificationKind::Match => format!("You matched with {name}!"),
            NotificationKind::Unlike => format!("{name} unliked your profile"),
            NotificationKind::DateProposal => format!("{name} proposed a date"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_entry() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": 12,
            "type": "match",
            "from_user": {"id": 5, "username": "jo", "first_name": "Jo"},
            "is_read": false,
            "created_at": "2026-10-01T12:00:00"
        }))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::Match);
        assert_eq!(n.describe(), "You matched with Jo!");
    }

    #[test]
    fn test_describe_without_source() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": 1, "type": "visit", "from_user": {"id": null, "username": null, "first_name": null}
        }))
        .unwrap();
        assert!(!n.is_read);
        assert_eq!(n.describe(), "Someone visited your profile");
    }
}
