//! Identity persistence
//!
//! The identity is stored as one JSON document,
//! `{"userUuid": .., "userName": .., "role": ..}`, where `role` may be absent.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Identity, Role};
use crate::storage::Database;

/// Key of the identity document in local storage
pub const IDENTITY_KEY: &str = "user";

/// Persisted identity document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub user_uuid: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl From<&Identity> for IdentityRecord {
    fn from(identity: &Identity) -> Self {
        Self {
            user_uuid: identity.user_uuid.to_string(),
            user_name: identity.user_name.clone(),
            role: Some(identity.role),
        }
    }
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = Error;

    fn try_from(record: IdentityRecord) -> Result<Self> {
        let user_uuid = Uuid::parse_str(&record.user_uuid).map_err(|e| {
            Error::InvalidIdentity(format!("bad userUuid '{}': {}", record.user_uuid, e))
        })?;
        Ok(Self {
            user_uuid,
            user_name: record.user_name,
            role: record.role.unwrap_or_default(),
        })
    }
}

/// Persistent per-installation identity.
///
/// None of these operations touch the network.
pub trait IdentityStore {
    /// Previously persisted identity, if any
    fn load(&self) -> Result<Option<Identity>>;

    /// Persist name, role and uuid; saving the same identity twice is a no-op
    fn save(&self, identity: &Identity) -> Result<()>;

    /// The persisted identity, generating and saving a fresh one if needed
    fn ensure(&self) -> Result<Identity> {
        if let Some(identity) = self.load()? {
            return Ok(identity);
        }
        let identity = Identity::generate();
        self.save(&identity)?;
        info!(user_uuid = %identity.user_uuid, "Generated new identity");
        Ok(identity)
    }
}

impl IdentityStore for Database {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Option<Identity>> {
        let Some(json) = self.local_storage().get(IDENTITY_KEY)? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<IdentityRecord>(&json)
            .map_err(Error::from)
            .and_then(Identity::try_from);
        match parsed {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable identity record");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, identity), fields(user_uuid = %identity.user_uuid))]
    fn save(&self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_string(&IdentityRecord::from(identity))?;
        self.local_storage().set(IDENTITY_KEY, &json)
    }
}
