//! Control-plane contract
//!
//! The one seam between the reconciler and the remote side. Implementations
//! live in sibling crates (see `nerio-provision-rest`); tests use in-memory
//! fakes.

use async_trait::async_trait;

use crate::error::{AuthError, ProvisionResult};
use crate::fields::PropertyBag;
use crate::instance::{EndpointInfo, RawInstance};
use crate::types::{AccessToken, RootCredential, ServiceId};

/// The remote control-plane API, reduced to the four calls the
/// reconciler needs.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Exchange the root credential for a bearer token scoped to one
    /// service.
    async fn exchange_token(
        &self,
        credential: &RootCredential,
        service: &ServiceId,
    ) -> Result<AccessToken, AuthError>;

    /// Create a service instance from a projected property bag.
    ///
    /// The response must resolve to a `name` and a `url`; a second create
    /// with an existing declared name fails with a conflict.
    async fn create_instance(
        &self,
        service: &ServiceId,
        token: &AccessToken,
        properties: &PropertyBag,
    ) -> ProvisionResult<RawInstance>;

    /// Remove a service instance by name.
    ///
    /// Removing a name that does not exist surfaces a not-found error;
    /// the driver treats that as success.
    async fn remove_instance(
        &self,
        service: &ServiceId,
        name: &str,
        token: &AccessToken,
    ) -> ProvisionResult<()>;

    /// List the externally reachable endpoints of an instance.
    ///
    /// An empty list is a valid answer, not an error.
    async fn list_endpoints(
        &self,
        service: &ServiceId,
        name: &str,
        token: &AccessToken,
    ) -> ProvisionResult<Vec<EndpointInfo>>;
}
