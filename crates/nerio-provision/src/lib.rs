//! # Provisioning Framework
//!
//! Core abstractions for reconciling declared service instances against the
//! nerio control plane.
//!
//! A declared unit describes one desired instance of a catalog service
//! (a hosted container-based deployment). This crate turns that declaration
//! into remote side effects through a token-scoped API: create, read-back,
//! and delete, with consistent attribute projection between the declared
//! shape and the remote representation.
//!
//! ## Architecture
//!
//! One generic [`Reconciler`] replaces a per-service-type implementation of
//! the same pattern. Everything that varies between service types is data:
//! a [`ServiceSchema`] carrying the catalog key, the field mapping table,
//! and the endpoint capability flag, collected into a [`ServiceCatalog`]
//! built once at startup.
//!
//! ```ignore
//! use nerio_provision::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = ServiceCatalog::from_schemas([
//!     ServiceSchema::new("pg")
//!         .with_field(FieldSpec::new("password", FieldKind::String).required())
//!         .with_field(FieldSpec::new("plan", FieldKind::String))
//!         .with_endpoints(EndpointSupport::Discoverable),
//! ])?;
//!
//! let reconciler = Reconciler::new(control_plane, root_credential, catalog);
//!
//! let declared = DeclaredConfig::new("demo").with("password", "secret");
//! let record = reconciler.create(&ServiceId::new("pg"), &declared).await?;
//! println!("reachable at {}", record.url);
//!
//! reconciler.delete(&ServiceId::new("pg"), &record).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`types`] - Opaque identifiers and credentials (`ServiceId`, `AccessToken`)
//! - [`error`] - Error taxonomies with operation context
//! - [`fields`] - Declared configurations and property bags
//! - [`instance`] - Instance records and endpoints
//! - [`schema`] - Per-service mapping tables and capability flags
//! - [`registry`] - The service catalog
//! - [`traits`] - The [`ControlPlane`] contract
//! - [`broker`] - Service-scoped token acquisition
//! - [`projector`] - Declared-to-remote attribute projection
//! - [`resolver`] - External endpoint discovery
//! - [`driver`] - The create/read/update/delete reconciliation driver

pub mod broker;
pub mod driver;
pub mod error;
pub mod fields;
pub mod instance;
pub mod projector;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod traits;
pub mod types;

pub use broker::CredentialBroker;
pub use driver::{Reconciler, ReconcilerOptions};
pub use error::{
    AuthError, ProjectionError, ProvisionError, ProvisionResult, ReconcileError,
    ReconcileErrorKind, ReconcileResult,
};
pub use fields::{DeclaredConfig, FieldValue, PropertyBag};
pub use instance::{EndpointInfo, InstanceRecord, RawInstance};
pub use registry::{CatalogError, ServiceCatalog};
pub use schema::{EndpointSupport, FieldKind, FieldSpec, FieldTarget, ServiceSchema};
pub use traits::ControlPlane;
pub use types::{AccessToken, Operation, RootCredential, ServiceId};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::broker::CredentialBroker;
    pub use crate::driver::{Reconciler, ReconcilerOptions};
    pub use crate::error::{
        AuthError, ProjectionError, ProvisionError, ProvisionResult, ReconcileError,
        ReconcileErrorKind, ReconcileResult,
    };
    pub use crate::fields::{DeclaredConfig, FieldValue, PropertyBag};
    pub use crate::instance::{EndpointInfo, InstanceRecord, RawInstance};
    pub use crate::registry::{CatalogError, ServiceCatalog};
    pub use crate::schema::{EndpointSupport, FieldKind, FieldSpec, FieldTarget, ServiceSchema};
    pub use crate::traits::ControlPlane;
    pub use crate::types::{AccessToken, Operation, RootCredential, ServiceId};
}
