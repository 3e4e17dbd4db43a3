//! User accounts
//!
//! Typed user model in the remote wire shape, plus conversion to and from the
//! configuration value tree. The password is write-only: it is sent on create
//! and update but never read back into configuration state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::value::Value;

/// A remote user account
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier assigned by the remote system
    #[serde(rename = "_id", default)]
    pub id: String,

    pub username: String,

    #[serde(default)]
    pub password: String,

    pub role: UserRole,

    pub auth_type: AuthType,

    /// Assigned by the remote system
    #[serde(default, skip_serializing)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .field("auth_type", &self.auth_type)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

/// Permission level of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserRole {
    Admin,
    Operator,
    DefenderManager,
    Auditor,
    #[default]
    User,
    Ci,
}

impl UserRole {
    pub const VALID: &'static str = "admin, operator, defenderManager, auditor, user, ci";

    /// Parse the wire text form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            "defenderManager" => Some(Self::DefenderManager),
            "auditor" => Some(Self::Auditor),
            "user" => Some(Self::User),
            "ci" => Some(Self::Ci),
            _ => None,
        }
    }

    /// Wire text form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::DefenderManager => "defenderManager",
            Self::Auditor => "auditor",
            Self::User => "user",
            Self::Ci => "ci",
        }
    }
}

/// How a user authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthType {
    #[default]
    Basic,
    Ldap,
    Saml,
}

impl AuthType {
    pub const VALID: &'static str = "basic, ldap, saml";

    /// Parse the wire text form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Self::Basic),
            "ldap" => Some(Self::Ldap),
            "saml" => Some(Self::Saml),
            _ => None,
        }
    }

    /// Wire text form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Ldap => "ldap",
            Self::Saml => "saml",
        }
    }
}

macro_rules! text_enum_serde {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                <$ty>::parse(&text).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid {} {:?} (valid: {})",
                        $what,
                        text,
                        <$ty>::VALID
                    ))
                })
            }
        }
    };
}

text_enum_serde!(UserRole, "user role");
text_enum_serde!(AuthType, "auth type");

/// Read a user from its configuration map
///
/// `username`, `password`, `role` and `auth_type` are all required.
pub fn user_to_domain(config: &Value) -> Result<User> {
    let map = config.as_map("")?;
    let text = |key: &str| -> Result<String> {
        match map.get(key) {
            Some(v) => v.as_str(key).map(str::to_string),
            None => Err(Error::missing(key)),
        }
    };

    let role_text = text("role")?;
    let role = UserRole::parse(&role_text)
        .ok_or_else(|| Error::enum_value("role", role_text, UserRole::VALID))?;

    let auth_text = text("auth_type")?;
    let auth_type = AuthType::parse(&auth_text)
        .ok_or_else(|| Error::enum_value("auth_type", auth_text, AuthType::VALID))?;

    Ok(User {
        id: String::new(),
        username: text("username")?,
        password: text("password")?,
        role,
        auth_type,
        last_modified: None,
    })
}

/// Render a user as its configuration map, without the password
pub fn user_from_domain(user: &User) -> Value {
    Value::map([
        ("username", user.username.as_str()),
        ("role", user.role.as_str()),
        ("auth_type", user.auth_type.as_str()),
    ])
}
