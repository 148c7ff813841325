use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// Directory view of a user, owned by the tenant/user collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub tenant_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub active: bool,
}

impl UserProfile {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_active_reviewer(&self) -> bool {
        self.active && self.has_role(Role::Reviewer)
    }
}

/// Entry in the reviewer picker, cached per tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerOption {
    pub user_id: i64,
    pub display_name: String,
}

impl From<&UserProfile> for ReviewerOption {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name.clone(),
        }
    }
}
