//! Provisioning framework type definitions
//!
//! Newtype wrappers for catalog keys, credentials, and operation names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog key naming which backend service template an instance is
/// created from (e.g. `"pg"`, `"redis"`, `"grafana"`).
///
/// Service identifiers are fixed per service type and never user-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a service identifier from a catalog key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the catalog key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServiceId {
    type Err = ParseServiceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseServiceIdError);
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Error parsing a service identifier from a string.
#[derive(Debug, Clone)]
pub struct ParseServiceIdError;

impl fmt::Display for ParseServiceIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service identifier must not be empty")
    }
}

impl std::error::Error for ParseServiceIdError {}

/// Long-lived personal access token for the control plane.
///
/// Supplied once at host-configuration time. The value is never logged;
/// `Debug` and `Display` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RootCredential(String);

impl RootCredential {
    /// Wrap a raw credential string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the raw credential for use in an authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check whether the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RootCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootCredential(***)")
    }
}

impl fmt::Display for RootCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Short-lived bearer token scoped to one [`ServiceId`].
///
/// Obtained from the root credential by the credential broker, used for a
/// single create/delete operation, and discarded. Redacted in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for use in an authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Lifecycle operation requested by the host orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Provision a new instance from a declared configuration.
    Create,
    /// Return the locally stored record.
    Read,
    /// Unsupported; instances are replaced, not mutated.
    Update,
    /// Tear down a previously created instance.
    Delete,
}

impl Operation {
    /// Get the lowercase string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_parse() {
        let id: ServiceId = "grafana".parse().unwrap();
        assert_eq!(id.as_str(), "grafana");
        assert!("".parse::<ServiceId>().is_err());
    }

    #[test]
    fn test_credentials_are_redacted() {
        let root = RootCredential::new("super-secret");
        assert_eq!(format!("{root:?}"), "RootCredential(***)");
        assert_eq!(root.to_string(), "***");
        assert_eq!(root.expose(), "super-secret");

        let token = AccessToken::new("tok-123");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.to_string(), "***");
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "create");
        assert_eq!(Operation::Delete.as_str(), "delete");
    }
}
