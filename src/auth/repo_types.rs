use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record joined with its role name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, never sent to clients
    pub role_id: i64,
    pub role: String,
    pub last_login_time: Option<OffsetDateTime>,
    pub logout_time: Option<OffsetDateTime>,
}

impl User {
    pub fn role_kind(&self) -> Option<RoleKind> {
        RoleKind::from_name(&self.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Roles the session knows how to serve. Authorization is role-name equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Admin,
    Chef,
    Employee,
}

impl RoleKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Admin" => Some(Self::Admin),
            "Chef" => Some(Self::Chef),
            "Employee" => Some(Self::Employee),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Chef => "Chef",
            Self::Employee => "Employee",
        }
    }
}
