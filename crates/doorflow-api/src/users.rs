//! User types (`GET /auth/users`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Dispatcher,
    Technician,
    /// Roles this client does not know about are kept verbatim.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Dispatcher => f.write_str("dispatcher"),
            Role::Technician => f.write_str("technician"),
            Role::Other(name) => f.write_str(name),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "dispatcher" => Role::Dispatcher,
            "technician" | "tech" => Role::Technician,
            other => Role::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_role_preserved() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "sam",
            "role": "installer"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Other("installer".to_string()));
        assert!(user.is_active);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Tech".parse::<Role>().unwrap(), Role::Technician);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }
}
