// Role gate for dashboards. Sessions and identity come from outside.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Guide,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Admin,
    Guide,
    Customer,
}

impl Dashboard {
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Dashboard::Admin => &[Role::Admin],
            Dashboard::Guide => &[Role::Guide, Role::Admin],
            Dashboard::Customer => &[Role::Customer, Role::Admin],
        }
    }
}

pub trait Authorizer: Send + Sync + 'static {
    fn is_authorized(&self, user: Option<&User>, required_roles: &[Role]) -> bool;
}

// Signed-in users pass an empty role list; otherwise one matching role is enough
#[derive(Debug, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn is_authorized(&self, user: Option<&User>, required_roles: &[Role]) -> bool {
        is_authorized(user, required_roles)
    }
}

pub fn is_authorized(user: Option<&User>, required_roles: &[Role]) -> bool {
    user.map_or(false, |user| {
        required_roles.is_empty() || user.roles.iter().any(|r| required_roles.contains(r))
    })
}
