use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::DeskError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Member => "member",
        })
    }
}

impl FromStr for Role {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" | "user" => Ok(Role::Member),
            other => Err(DeskError::validation(format!(
                "unknown role '{}'. Supported: admin, member",
                other
            ))),
        }
    }
}

/// The signed-in user, the auth token and the selected role.
///
/// Loaded once per invocation and handed to whatever needs it; see
/// [`crate::storage::load_session`] and friends for persistence.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_at: Option<DateTime<Local>>,
}

impl Session {
    pub fn login(username: impl Into<String>, token: impl Into<String>, role: Role) -> Self {
        Session {
            username: Some(username.into()),
            token: Some(token.into()),
            role,
            logged_in_at: Some(Local::now()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role == Role::Admin
    }

    /// Fails unless the session belongs to a signed-in admin.
    pub fn require_admin(&self, action: &str) -> Result<(), DeskError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DeskError::permission_denied(format!(
                "{} requires an admin session (run `taskdesk login --role admin`)",
                action
            )))
        }
    }
}
