//! # Caller Identity
//!
//! Every operation receives an explicit [`Actor`]. Role strings coming from
//! the authentication collaborator are parsed once, at the boundary, into the
//! closed [`Role`] set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles a user may hold within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Submits tasks and resubmissions
    User,
    /// Reviews tasks assigned to them
    Reviewer,
    TenantAdmin,
    PlatformAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Reviewer => "REVIEWER",
            Self::TenantAdmin => "TENANT_ADMIN",
            Self::PlatformAdmin => "PLATFORM_ADMIN",
        }
    }

    /// Parse a role list as stored by the user directory.
    ///
    /// Accepts comma separated values with or without JSON array decoration
    /// (`USER,REVIEWER` or `["USER","REVIEWER"]`). Unknown entries are skipped.
    pub fn parse_list(raw: &str) -> Vec<Role> {
        let mut roles = Vec::new();
        for entry in raw
            .split(',')
            .map(|s| s.trim_matches(|c: char| c.is_whitespace() || "[]\"'".contains(c)))
        {
            if let Ok(role) = entry.parse::<Role>() {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
        }
        roles
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "REVIEWER" => Ok(Self::Reviewer),
            "TENANT_ADMIN" => Ok(Self::TenantAdmin),
            "PLATFORM_ADMIN" => Ok(Self::PlatformAdmin),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub tenant_id: i64,
    pub user_id: i64,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(tenant_id: i64, user_id: i64, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            tenant_id,
            user_id,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
