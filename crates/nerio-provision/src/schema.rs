//! Per-service provisioning schemas
//!
//! One [`ServiceSchema`] describes everything that varies between service
//! types: the catalog key, the field mapping table, and whether the service
//! exposes discoverable external endpoints. Service types are data in a
//! table, not code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fields::FieldValue;
use crate::types::ServiceId;

/// Property-bag key under which the declared instance name is always sent.
pub const NAME_KEY: &str = "name";

/// Kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A string field.
    String,
    /// An integer field.
    Integer,
    /// A boolean field.
    Boolean,
}

impl FieldKind {
    /// Get the lowercase string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }

    /// Check whether a value has this kind.
    pub fn matches(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, FieldValue::String(_))
                | (FieldKind::Integer, FieldValue::Integer(_))
                | (FieldKind::Boolean, FieldValue::Boolean(_))
        )
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination of a declared field in the property bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldTarget {
    /// Send the value under the given property key.
    Property {
        /// The property-bag key the control plane expects.
        key: String,
    },
    /// The field configures local behavior only and is never sent.
    Drop,
}

/// A single entry in a service's field mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared field name.
    pub name: String,

    /// Kind the declared value must have.
    pub kind: FieldKind,

    /// Whether projection fails when the field has no declared value.
    #[serde(default)]
    pub required: bool,

    /// Where the value goes in the property bag.
    pub target: FieldTarget,

    /// Send an empty string when the field is optional and absent.
    ///
    /// Some control-plane services take an empty-string sentinel instead of
    /// an omitted key. Only meaningful for string fields.
    #[serde(default)]
    pub absent_as_empty: bool,
}

impl FieldSpec {
    /// Create a field spec mapping the declared name to the same-named
    /// property key.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let key = name.clone();
        Self {
            name,
            kind,
            required: false,
            target: FieldTarget::Property { key },
            absent_as_empty: false,
        }
    }

    /// Mark the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Send the value under a different property key.
    #[must_use]
    pub fn mapped_to(mut self, key: impl Into<String>) -> Self {
        self.target = FieldTarget::Property { key: key.into() };
        self
    }

    /// Never send the value to the control plane.
    #[must_use]
    pub fn dropped(mut self) -> Self {
        self.target = FieldTarget::Drop;
        self
    }

    /// Send an empty string when the optional field is absent.
    #[must_use]
    pub fn absent_as_empty(mut self) -> Self {
        self.absent_as_empty = true;
        self
    }

    /// The property key this field maps to, if it is sent at all.
    pub fn property_key(&self) -> Option<&str> {
        match &self.target {
            FieldTarget::Property { key } => Some(key),
            FieldTarget::Drop => None,
        }
    }
}

/// Whether a service type exposes discoverable external endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSupport {
    /// The service exposes no external endpoints; the resolver is skipped.
    #[default]
    None,
    /// External endpoints can be queried after creation.
    Discoverable,
}

/// Invalid service schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The service identifier is empty.
    #[error("service identifier must not be empty")]
    EmptyService,

    /// Two field specs share a declared name.
    #[error("duplicate field '{name}' in schema for service '{service}'")]
    DuplicateField { service: ServiceId, name: String },

    /// Two field specs map to the same property key.
    #[error("duplicate property key '{key}' in schema for service '{service}'")]
    DuplicateTarget { service: ServiceId, key: String },

    /// A field uses the reserved instance-name key.
    #[error("property key '{NAME_KEY}' is reserved for the instance name (service '{service}')")]
    ReservedKey { service: ServiceId },
}

/// The declarative description of one service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSchema {
    service: ServiceId,
    fields: Vec<FieldSpec>,
    #[serde(default)]
    endpoints: EndpointSupport,
}

impl ServiceSchema {
    /// Create a schema for a service identifier.
    pub fn new(service: impl Into<ServiceId>) -> Self {
        Self {
            service: service.into(),
            fields: Vec::new(),
            endpoints: EndpointSupport::default(),
        }
    }

    /// Add a field mapping.
    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the endpoint capability.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointSupport) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// The service identifier this schema describes.
    pub fn service(&self) -> &ServiceId {
        &self.service
    }

    /// The field mapping table.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field spec by declared name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether instances of this service expose discoverable endpoints.
    pub fn has_endpoints(&self) -> bool {
        self.endpoints == EndpointSupport::Discoverable
    }

    /// Validate the mapping table.
    ///
    /// The table must be total and unambiguous: no duplicate declared
    /// names, no duplicate property keys, and no use of the reserved
    /// instance-name key.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.service.is_empty() {
            return Err(SchemaError::EmptyService);
        }

        let mut names = std::collections::BTreeSet::new();
        let mut keys = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    service: self.service.clone(),
                    name: field.name.clone(),
                });
            }
            if let Some(key) = field.property_key() {
                if key == NAME_KEY {
                    return Err(SchemaError::ReservedKey {
                        service: self.service.clone(),
                    });
                }
                if !keys.insert(key) {
                    return Err(SchemaError::DuplicateTarget {
                        service: self.service.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_schema() -> ServiceSchema {
        ServiceSchema::new("pg")
            .with_field(FieldSpec::new("password", FieldKind::String).required())
            .with_field(FieldSpec::new("plan", FieldKind::String))
            .with_field(FieldSpec::new("admin_user", FieldKind::String).mapped_to("adminUser"))
            .with_field(FieldSpec::new("skip_backups", FieldKind::Boolean).dropped())
            .with_endpoints(EndpointSupport::Discoverable)
    }

    #[test]
    fn test_schema_builder() {
        let schema = demo_schema();
        assert_eq!(schema.service().as_str(), "pg");
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.has_endpoints());
        assert!(schema.field("plan").is_some());
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_schema_validates() {
        assert!(demo_schema().validate().is_ok());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let schema = ServiceSchema::new("pg")
            .with_field(FieldSpec::new("plan", FieldKind::String))
            .with_field(FieldSpec::new("plan", FieldKind::String));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let schema = ServiceSchema::new("pg")
            .with_field(FieldSpec::new("plan", FieldKind::String).mapped_to("tier"))
            .with_field(FieldSpec::new("size", FieldKind::String).mapped_to("tier"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn test_reserved_name_key_rejected() {
        let schema =
            ServiceSchema::new("pg").with_field(FieldSpec::new("alias", FieldKind::String).mapped_to("name"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ReservedKey { .. })
        ));
    }

    #[test]
    fn test_field_kind_matches() {
        assert!(FieldKind::String.matches(&FieldValue::from("x")));
        assert!(FieldKind::Integer.matches(&FieldValue::from(1)));
        assert!(!FieldKind::Boolean.matches(&FieldValue::from("true")));
    }

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = demo_schema();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("\"type\":\"drop\""));
        let parsed: ServiceSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}
