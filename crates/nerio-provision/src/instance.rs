//! Instance records and endpoints
//!
//! [`RawInstance`] is the decoded create response as the control plane
//! returned it; [`InstanceRecord`] is the canonical record the host
//! persists, produced by merging the raw response with the declared
//! configuration.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldValue, PropertyBag};

/// An externally reachable address/port pair exposed by an instance,
/// distinct from its primary URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Externally reachable address.
    pub external_address: String,
    /// Externally reachable port.
    pub external_port: u16,
}

impl EndpointInfo {
    /// Create an endpoint.
    pub fn new(external_address: impl Into<String>, external_port: u16) -> Self {
        Self {
            external_address: external_address.into(),
            external_port,
        }
    }
}

/// The control plane's response to a create call, after typed decoding.
///
/// `name` and `url` are mandatory in the contract; a response missing
/// either never becomes a `RawInstance`. Echoed properties beyond the two
/// mandatory fields are carried in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstance {
    name: String,
    url: String,
    extra: PropertyBag,
}

impl RawInstance {
    /// Create a raw instance from the two mandatory response fields.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            extra: PropertyBag::new(),
        }
    }

    /// Attach an echoed property.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// The instance name assigned or echoed by the control plane.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary reachable URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Properties echoed by the control plane beyond `name` and `url`.
    pub fn extra(&self) -> &PropertyBag {
        &self.extra
    }
}

/// Canonical remote representation of a service instance.
///
/// Created on a successful create operation and persisted by the host,
/// which supplies it back unchanged on delete. Never partially
/// constructed: either create fully succeeds and yields a record, or it
/// fails and no record exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Stable instance name, globally unique per service.
    pub name: String,
    /// Primary reachable endpoint.
    pub url: String,
    /// Address of the primary external endpoint, empty when none exists.
    #[serde(default)]
    pub external_address: String,
    /// Port of the primary external endpoint, zero when none exists.
    #[serde(default)]
    pub external_port: u16,
    /// All external endpoints, in the control plane's order.
    #[serde(default)]
    pub endpoints: Vec<EndpointInfo>,
    /// Merged service-specific fields: remote echoes win, declared values
    /// pass through where the remote did not echo them.
    #[serde(default)]
    pub fields: PropertyBag,
}

impl InstanceRecord {
    /// The primary external endpoint, by convention the first one in the
    /// control plane's ordering. `None` when the instance exposes no
    /// external endpoints.
    pub fn primary_endpoint(&self) -> Option<&EndpointInfo> {
        self.endpoints.first()
    }

    /// Get a merged field value.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
