//! Attribute projection
//!
//! Two directions: [`to_properties`] flattens a declared configuration into
//! the property bag the control plane expects, and [`to_record`] merges the
//! control plane's response back with the declared values into the
//! canonical record. Both directions are typed and fail closed with a
//! [`ProjectionError`] instead of guessing.

use crate::error::ProjectionError;
use crate::fields::{DeclaredConfig, FieldValue, PropertyBag};
use crate::instance::{EndpointInfo, InstanceRecord, RawInstance};
use crate::schema::{FieldKind, ServiceSchema, NAME_KEY};

/// Project a declared configuration into the property bag for a create
/// call.
///
/// The declared name is always sent under the reserved `name` key. Fields
/// are renamed per the schema's mapping table; optional fields with no
/// declared value are omitted unless the schema asks for an empty-string
/// sentinel. A declared field the table does not cover is an error: the
/// mapping is total by construction.
pub fn to_properties(
    schema: &ServiceSchema,
    declared: &DeclaredConfig,
) -> Result<PropertyBag, ProjectionError> {
    let mut bag = PropertyBag::new();
    bag.insert(NAME_KEY, declared.name());

    for spec in schema.fields() {
        match declared.get(&spec.name) {
            Some(value) => {
                if !spec.kind.matches(value) {
                    return Err(ProjectionError::UnexpectedType {
                        field: spec.name.clone(),
                        expected: spec.kind.as_str(),
                        found: value.kind_name(),
                    });
                }
                if let Some(key) = spec.property_key() {
                    bag.insert(key, value.clone());
                }
            }
            None if spec.required => {
                return Err(ProjectionError::MissingField {
                    field: spec.name.clone(),
                });
            }
            None => {
                if spec.absent_as_empty && spec.kind == FieldKind::String {
                    if let Some(key) = spec.property_key() {
                        bag.insert(key, "");
                    }
                }
            }
        }
    }

    for field in declared.field_names() {
        if schema.field(field).is_none() {
            return Err(ProjectionError::UnmappedField {
                field: field.to_string(),
            });
        }
    }

    Ok(bag)
}

/// Merge a create response with the declared configuration into the
/// canonical instance record.
///
/// Values echoed by the control plane win; declared values pass through
/// where the control plane stayed silent. Every field present in either
/// side appears in the output exactly once. Echoes are matched by the
/// schema's property key and stored under the declared field name; echoed
/// keys the mapping does not know are carried as-is.
pub fn to_record(
    schema: &ServiceSchema,
    raw: &RawInstance,
    declared: &DeclaredConfig,
    endpoints: Vec<EndpointInfo>,
) -> Result<InstanceRecord, ProjectionError> {
    let mut fields = PropertyBag::new();
    let mut consumed = std::collections::BTreeSet::new();

    for spec in schema.fields() {
        let echoed = spec
            .property_key()
            .and_then(|key| raw.extra().get(key).map(|value| (key, value)));

        match echoed {
            Some((key, value)) => {
                if !spec.kind.matches(value) {
                    return Err(ProjectionError::UnexpectedType {
                        field: spec.name.clone(),
                        expected: spec.kind.as_str(),
                        found: value.kind_name(),
                    });
                }
                fields.insert(spec.name.clone(), value.clone());
                consumed.insert(key.to_string());
            }
            None => {
                if let Some(value) = declared.get(&spec.name) {
                    fields.insert(spec.name.clone(), value.clone());
                }
            }
        }
    }

    // Echoed keys outside the mapping table pass through under their own
    // names. The mandatory name/url fields live on the record itself.
    for (key, value) in raw.extra().iter() {
        if key == NAME_KEY || key == "url" || consumed.contains(key) {
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }

    let (external_address, external_port) = endpoints
        .first()
        .map_or_else(|| (String::new(), 0), |e| (e.external_address.clone(), e.external_port));

    Ok(InstanceRecord {
        name: raw.name().to_string(),
        url: raw.url().to_string(),
        external_address,
        external_port,
        endpoints,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EndpointSupport, FieldSpec};

    fn pg_schema() -> ServiceSchema {
        ServiceSchema::new("pg")
            .with_field(FieldSpec::new("password", FieldKind::String).required())
            .with_field(FieldSpec::new("plan", FieldKind::String))
            .with_field(FieldSpec::new("admin_user", FieldKind::String).mapped_to("adminUser"))
            .with_field(FieldSpec::new("replicas", FieldKind::Integer))
            .with_field(FieldSpec::new("local_only", FieldKind::Boolean).dropped())
            .with_field(FieldSpec::new("comment", FieldKind::String).absent_as_empty())
            .with_endpoints(EndpointSupport::Discoverable)
    }

    #[test]
    fn test_to_properties_renames_and_omits() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("admin_user", "root")
            .with("local_only", true);

        let bag = to_properties(&pg_schema(), &declared).unwrap();

        assert_eq!(bag.get("name").and_then(FieldValue::as_str), Some("demo"));
        assert_eq!(bag.get("password").and_then(FieldValue::as_str), Some("secret"));
        assert_eq!(bag.get("adminUser").and_then(FieldValue::as_str), Some("root"));
        // optional and absent: omitted, not sent as empty
        assert!(!bag.contains_key("plan"));
        assert!(!bag.contains_key("replicas"));
        // dropped: configures local behavior only
        assert!(!bag.contains_key("local_only"));
        // empty-string sentinel requested by the schema
        assert_eq!(bag.get("comment").and_then(FieldValue::as_str), Some(""));
    }

    #[test]
    fn test_to_properties_missing_required() {
        let declared = DeclaredConfig::new("demo");
        let err = to_properties(&pg_schema(), &declared).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::MissingField { ref field } if field == "password"
        ));
    }

    #[test]
    fn test_to_properties_unmapped_field() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("surprise", 1);
        let err = to_properties(&pg_schema(), &declared).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::UnmappedField { ref field } if field == "surprise"
        ));
    }

    #[test]
    fn test_to_properties_type_mismatch() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("replicas", "three");
        let err = to_properties(&pg_schema(), &declared).unwrap_err();
        assert!(matches!(err, ProjectionError::UnexpectedType { .. }));
    }

    #[test]
    fn test_to_record_passes_through_declared_fields() {
        // The spec scenario: remote echoes only name and url, no endpoints.
        let declared = DeclaredConfig::new("demo").with("password", "secret");
        let raw = RawInstance::new("demo", "https://demo.example.test");

        let record = to_record(&pg_schema(), &raw, &declared, Vec::new()).unwrap();

        assert_eq!(record.name, "demo");
        assert_eq!(record.url, "https://demo.example.test");
        assert_eq!(record.field("password").and_then(FieldValue::as_str), Some("secret"));
        assert_eq!(record.external_address, "");
        assert_eq!(record.external_port, 0);
        assert!(record.endpoints.is_empty());
    }

    #[test]
    fn test_to_record_remote_wins() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("plan", "small");
        let raw = RawInstance::new("demo", "https://demo.example.test")
            .with_extra("plan", "small-1x") // control plane normalized the plan
            .with_extra("region", "eu-west-1"); // not declared at all

        let record = to_record(&pg_schema(), &raw, &declared, Vec::new()).unwrap();

        assert_eq!(record.field("plan").and_then(FieldValue::as_str), Some("small-1x"));
        assert_eq!(record.field("password").and_then(FieldValue::as_str), Some("secret"));
        assert_eq!(record.field("region").and_then(FieldValue::as_str), Some("eu-west-1"));
        // totality: each field exactly once
        assert_eq!(record.fields.len(), 3);
    }

    #[test]
    fn test_to_record_renamed_echo_maps_back() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("admin_user", "root");
        let raw = RawInstance::new("demo", "https://demo.example.test")
            .with_extra("adminUser", "root-1");

        let record = to_record(&pg_schema(), &raw, &declared, Vec::new()).unwrap();

        // stored under the declared name, not the wire key, and only once
        assert_eq!(record.field("admin_user").and_then(FieldValue::as_str), Some("root-1"));
        assert!(record.field("adminUser").is_none());
    }

    #[test]
    fn test_to_record_mistyped_echo_fails_closed() {
        let declared = DeclaredConfig::new("demo").with("password", "secret");
        let raw = RawInstance::new("demo", "https://demo.example.test")
            .with_extra("plan", 9000);

        let err = to_record(&pg_schema(), &raw, &declared, Vec::new()).unwrap_err();
        assert!(matches!(err, ProjectionError::UnexpectedType { .. }));
    }

    #[test]
    fn test_to_record_primary_endpoint_is_first() {
        let declared = DeclaredConfig::new("demo").with("password", "secret");
        let raw = RawInstance::new("demo", "https://demo.example.test");
        let endpoints = vec![
            EndpointInfo::new("203.0.113.10", 5432),
            EndpointInfo::new("203.0.113.11", 5433),
        ];

        let record = to_record(&pg_schema(), &raw, &declared, endpoints).unwrap();

        assert_eq!(record.external_address, "203.0.113.10");
        assert_eq!(record.external_port, 5432);
        assert_eq!(record.endpoints.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_declared_fields() {
        let declared = DeclaredConfig::new("demo")
            .with("password", "secret")
            .with("plan", "small")
            .with("replicas", 2);

        let bag = to_properties(&pg_schema(), &declared).unwrap();

        // A control plane that echoes nothing beyond the mandatory fields.
        let name = bag.get("name").and_then(FieldValue::as_str).unwrap();
        let raw = RawInstance::new(name, format!("https://{name}.example.test"));

        let record = to_record(&pg_schema(), &raw, &declared, Vec::new()).unwrap();
        for (field, value) in declared.iter() {
            assert_eq!(record.field(field), Some(value), "field '{field}' lost");
        }
    }
}
