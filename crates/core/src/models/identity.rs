//! Local identity model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Participation role in a room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Casts votes and is waited on before votes are revealed
    #[default]
    Voter,
    /// Observes without voting
    Watcher,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Voter => "Voter",
            Role::Watcher => "Watcher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voter" => Ok(Role::Voter),
            "watcher" => Ok(Role::Watcher),
            other => Err(Error::Parse(format!("unknown role '{}'", other))),
        }
    }
}

/// Stable per-installation identity.
///
/// `user_uuid` is generated locally once and used as the private key of the
/// connection address. The server answers with a separate public uuid that
/// other participants see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_uuid: Uuid,
    pub user_name: String,
    pub role: Role,
}

impl Identity {
    /// Fresh identity with a random uuid and the default role
    pub fn generate() -> Self {
        Self {
            user_uuid: Uuid::new_v4(),
            user_name: String::new(),
            role: Role::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("voter".parse::<Role>().unwrap(), Role::Voter);
        assert_eq!(" Watcher ".parse::<Role>().unwrap(), Role::Watcher);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_generate_defaults_to_voter() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_eq!(a.role, Role::Voter);
        assert!(a.user_name.is_empty());
        assert_ne!(a.user_uuid, b.user_uuid);
    }
}
