//! The profile snapshot mirrored from `profile/me` and its derived
//! completeness record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserIdentity;
use crate::types::{Gender, ImageId, SexualPreference, TagId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileImage {
    pub id: ImageId,
    pub file_path: String,
    #[serde(default)]
    pub is_profile_pic: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag {
    pub id: TagId,
    pub tag_name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Server-sourced mirror of the user's dating profile.
///
/// Replaced wholesale on every successful fetch, never patched locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSnapshot {
    pub id: UserId,
    pub username: String,
    pub email: String,
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
    pub location: Location,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub fame_rating: f64,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, with = "crate::timestamp::option")]
    pub last_online: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub images: Vec<ProfileImage>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl ProfileSnapshot {
    /// The image flagged as profile picture, if any.
    pub fn primary_image(&self) -> Option<&ProfileImage> {
        self.images.iter().find(|img| img.is_profile_pic)
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }

    pub fn completeness(&self) -> ProfileCompleteness {
        ProfileCompleteness::of(self)
    }
}

/// The five independent predicates gating access to the app.
///
/// Always derived from a snapshot on demand; holders must not keep one
/// around after the snapshot it came from has been replaced.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct ProfileCompleteness {
    pub has_gender: bool,
    pub has_sexual_preference: bool,
    pub has_bio: bool,
    pub has_tag: bool,
    pub has_image: bool,
}

impl ProfileCompleteness {
    pub fn of(profile: &ProfileSnapshot) -> Self {
        Self {
            has_gender: profile.gender.is_some(),
            has_sexual_preference: profile.sexual_preference.is_some(),
            has_bio: profile
                .bio
                .as_deref()
                .is_some_and(|bio| !bio.trim().is_empty()),
            has_tag: !profile.tags.is_empty(),
            has_image: !profile.images.is_empty(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.has_gender
            && self.has_sexual_preference
            && self.has_bio
            && self.has_tag
            && self.has_image
    }

    /// Names of the predicates that are still false, in display order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (self.has_gender, "gender"),
            (self.has_sexual_preference, "sexual_preference"),
            (self.has_bio, "bio"),
            (self.has_tag, "tags"),
            (self.has_image, "images"),
        ]
        .into_iter()
        .filter(|(present, _)| !present)
        .map(|(_, name)| name)
        .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn profile_from(value: serde_json::Value) -> ProfileSnapshot {
        serde_json::from_value(value).unwrap()
    }

    fn predicate_profile(mask: u8, bio_text: &str, suffix: &str) -> ProfileSnapshot {
        let mut p = profile_from(serde_json::json!({
            "id": 1, "username": format!("u{suffix}"), "email": "u@example.com"
        }));
        if mask & 1 != 0 {
            p.gender = Some(Gender::Female);
        }
        if mask & 2 != 0 {
            p.sexual_preference = Some(SexualPreference::Gay);
        }
        if mask & 4 != 0 {
            p.bio = Some(bio_text.to_string());
        }
        if mask & 8 != 0 {
            p.tags.push(Tag {
                id: TagId(1),
                tag_name: format!("#tag{suffix}"),
            });
        }
        if mask & 16 != 0 {
            p.images.push(ProfileImage {
                id: ImageId(1),
                file_path: format!("/uploads/{suffix}.jpg"),
                is_profile_pic: true,
                created_at: None,
            });
        }
        p
    }

    #[test]
    fn test_incomplete_profile_scenario() {
        let p = profile_from(serde_json::json!({
            "id": 9, "username": "sam", "email": "sam@example.com",
            "gender": null, "sexual_preference": "Straight", "bio": "hi",
            "tags": [{"id": 1, "tag_name": "travel"}], "images": []
        }));
        let c = p.completeness();
        assert!(!c.has_gender);
        assert!(c.has_sexual_preference);
        assert!(c.has_bio);
        assert!(c.has_tag);
        assert!(!c.has_image);
        assert!(!c.is_complete());
        assert_eq!(c.missing(), vec!["gender", "images"]);
    }

    #[test]
    fn test_completeness_depends_only_on_predicates() {
        for mask in 0u8..32 {
            let a = predicate_profile(mask, "hi", "a");
            let b = predicate_profile(mask, "a much longer biography", "b");
            assert_eq!(a.completeness(), b.completeness(), "mask {mask:05b}");
            assert_eq!(a.completeness().is_complete(), mask == 31);
        }
    }

    #[test]
    fn test_whitespace_bio_is_empty() {
        let mut p = predicate_profile(31, "   ", "x");
        assert!(!p.completeness().has_bio);
        p.bio = None;
        assert!(!p.completeness().has_bio);
    }

    #[test]
    fn test_parse_profile_me_body() {
        let p = profile_from(serde_json::json!({
            "id": 4, "username": "kim", "email": "kim@example.com",
            "first_name": "Kim", "last_name": null, "bio": "coffee",
            "gender": "Female", "sexual_preference": "Bisexual",
            "location": {"latitude": 48.85, "longitude": 2.35},
            "age": 27, "date_of_birth": "1999-03-01", "fame_rating": 3.5,
            "is_verified": true, "last_online": "2026-10-01T10:00:00.5",
            "created_at": null,
            "images": [
                {"id": 2, "file_path": "/a.jpg", "is_profile_pic": false, "created_at": null},
                {"id": 3, "file_path": "/b.jpg", "is_profile_pic": true, "created_at": "2026-09-01T08:00:00"}
            ],
            "tags": [{"id": 1, "tag_name": "#coffee"}]
        }));
        assert_eq!(p.primary_image().map(|i| i.id), Some(ImageId(3)));
        assert_eq!(p.location.latitude, Some(48.85));
        assert!(p.last_online.is_some());
        assert!(p.completeness().is_complete());
        assert_eq!(p.identity().username, "kim");
    }
}
