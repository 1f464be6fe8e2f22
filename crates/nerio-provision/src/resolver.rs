//! Endpoint resolution
//!
//! Queries the externally reachable endpoints of a created instance when
//! the service schema says there are any to find. Zero endpoints is a
//! valid terminal state; transport failures are propagated, never papered
//! over with an empty list.

use tracing::debug;

use crate::error::ProvisionResult;
use crate::instance::EndpointInfo;
use crate::schema::ServiceSchema;
use crate::traits::ControlPlane;
use crate::types::AccessToken;

/// Resolve the external endpoints of an instance.
///
/// Services without the endpoint capability resolve to an empty list
/// without a remote call. The control plane's ordering is preserved; by
/// convention the first entry is the primary endpoint.
pub async fn resolve_endpoints<C>(
    control: &C,
    schema: &ServiceSchema,
    name: &str,
    token: &AccessToken,
) -> ProvisionResult<Vec<EndpointInfo>>
where
    C: ControlPlane + ?Sized,
{
    if !schema.has_endpoints() {
        return Ok(Vec::new());
    }

    let endpoints = control.list_endpoints(schema.service(), name, token).await?;
    if endpoints.is_empty() {
        debug!(service = %schema.service(), name, "instance exposes no external endpoints");
    }
    Ok(endpoints)
}
