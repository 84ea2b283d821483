use crate::domain::sales::UserId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Sales,
}

impl Role {
    pub const fn permissions(self) -> Permissions {
        match self {
            Role::Admin => Permissions {
                view_all_users: true,
                view_combined: true,
                manage_settings: true,
                manage_challenges: true,
            },
            Role::Manager => Permissions {
                view_all_users: true,
                view_combined: true,
                manage_settings: false,
                manage_challenges: true,
            },
            Role::Sales => Permissions {
                view_all_users: false,
                view_combined: false,
                manage_settings: false,
                manage_challenges: false,
            },
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "sales" => Ok(Role::Sales),
            _ => anyhow::bail!("Invalid role: {}. Must be 'admin', 'manager' or 'sales'", s),
        }
    }
}

/// What a role may see and change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub view_all_users: bool,
    /// The combined all-users summary
    pub view_combined: bool,
    pub manage_settings: bool,
    pub manage_challenges: bool,
}

/// Whose records feed an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "user_id")]
pub enum AggregationScope {
    OwnData(UserId),
    AllUsers,
}

impl AggregationScope {
    pub fn includes(&self, user: &UserId) -> bool {
        match self {
            AggregationScope::OwnData(own) => own == user,
            AggregationScope::AllUsers => true,
        }
    }
}

/// The user a dashboard is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: UserId,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn permissions(&self) -> Permissions {
        self.role.permissions()
    }

    pub fn scope(&self) -> AggregationScope {
        if self.permissions().view_all_users {
            AggregationScope::AllUsers
        } else {
            AggregationScope::OwnData(self.user_id)
        }
    }
}
