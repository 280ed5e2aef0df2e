use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::Id;

/// Account owner as seen by the sync subsystem.
///
/// Only the fields the core reads are modeled; the session layer owns the rest.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nes_api_key: Option<String>,
    /// Membership list of customer ids.
    #[serde(default)]
    pub customers: Vec<Id>,
}

impl User {
    pub fn new(id: Id, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            email: email.into(),
            nes_api_key: None,
            customers: Vec::new(),
        }
    }

    pub fn with_nes_api_key(mut self, key: impl Into<String>) -> Self {
        self.nes_api_key = Some(key.into());
        self
    }

    /// Upstream API key; blank keys count as missing.
    pub fn nes_api_key(&self) -> Option<SecretString> {
        self.nes_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string()))
    }

    pub fn has_nes_api_key(&self) -> bool {
        self.nes_api_key().is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field(
                "nes_api_key",
                &self.nes_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("customers", &self.customers)
            .finish()
    }
}
