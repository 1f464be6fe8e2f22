//! Service catalog
//!
//! All service schemas are collected into one [`ServiceCatalog`] built once
//! at startup. Registration is explicit; there is no global mutable state
//! and no import-time side effects.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::schema::{SchemaError, ServiceSchema};
use crate::types::ServiceId;

/// Error building a service catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two schemas claim the same service identifier.
    #[error("service '{0}' is registered twice")]
    Duplicate(ServiceId),

    /// A schema failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Immutable map from service identifier to its provisioning schema.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    schemas: BTreeMap<ServiceId, ServiceSchema>,
}

impl ServiceCatalog {
    /// Build a catalog from a list of schemas.
    ///
    /// Every schema is validated; duplicate service identifiers are
    /// rejected.
    pub fn from_schemas(
        schemas: impl IntoIterator<Item = ServiceSchema>,
    ) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for schema in schemas {
            schema.validate()?;
            let service = schema.service().clone();
            if map.insert(service.clone(), schema).is_some() {
                return Err(CatalogError::Duplicate(service));
            }
        }
        Ok(Self { schemas: map })
    }

    /// Look up the schema for a service identifier.
    pub fn get(&self, service: &ServiceId) -> Option<&ServiceSchema> {
        self.schemas.get(service)
    }

    /// Iterate over registered service identifiers in order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceId> {
        self.schemas.keys()
    }

    /// Get the number of registered services.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
