use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Minimal identity of the logged-in user, persisted next to the token.
/// Immutable for the lifetime of a session once set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl UserIdentity {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Username/password pair submitted to `auth/login`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful `auth/login` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_json_round_trip() {
        let identity = UserIdentity {
            id: UserId(3),
            username: "alice".into(),
            email: "alice@example.com".into(),
        };
        let json = identity.to_json().unwrap();
        assert_eq!(UserIdentity::from_json(&json).unwrap(), identity);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new(" alice ", "hunter2");
        assert_eq!(creds.username, "alice");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_login_response_parse() {
        let body = serde_json::json!({
            "message": "Login successful",
            "token": "jwt",
            "user": {"id": 1, "username": "bob", "email": "bob@example.com"}
        });
        let resp: LoginResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.token, "jwt");
        assert_eq!(resp.user.id, UserId(1));
    }
}
