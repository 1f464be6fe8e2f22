//! Credential broker
//!
//! Turns the long-lived root credential into a short-lived token scoped to
//! one service. Tokens are fetched fresh for every operation and never
//! cached; a rejected exchange is fatal for the current operation and is
//! not retried here.

use tracing::debug;

use crate::error::AuthError;
use crate::traits::ControlPlane;
use crate::types::{AccessToken, RootCredential, ServiceId};

/// Obtains service-scoped access tokens from the root credential.
#[derive(Debug, Clone)]
pub struct CredentialBroker {
    credential: RootCredential,
}

impl CredentialBroker {
    /// Create a broker around the host-supplied root credential.
    pub fn new(credential: RootCredential) -> Self {
        Self { credential }
    }

    /// Fetch a token scoped to the given service.
    pub async fn service_token<C>(
        &self,
        control: &C,
        service: &ServiceId,
    ) -> Result<AccessToken, AuthError>
    where
        C: ControlPlane + ?Sized,
    {
        if self.credential.is_empty() {
            return Err(AuthError::EmptyCredential);
        }
        if service.is_empty() {
            return Err(AuthError::EmptyService);
        }

        debug!(service = %service, "fetching service-scoped access token");
        control.exchange_token(&self.credential, service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProvisionError, ProvisionResult};
    use crate::fields::PropertyBag;
    use crate::instance::{EndpointInfo, RawInstance};
    use async_trait::async_trait;

    struct TokenOnly;

    #[async_trait]
    impl ControlPlane for TokenOnly {
        async fn exchange_token(
            &self,
            credential: &RootCredential,
            service: &ServiceId,
        ) -> Result<AccessToken, AuthError> {
            Ok(AccessToken::new(format!(
                "{}:{}",
                credential.expose(),
                service
            )))
        }

        async fn create_instance(
            &self,
            _service: &ServiceId,
            _token: &AccessToken,
            _properties: &PropertyBag,
        ) -> ProvisionResult<RawInstance> {
            Err(ProvisionError::unavailable("not implemented"))
        }

        async fn remove_instance(
            &self,
            _service: &ServiceId,
            _name: &str,
            _token: &AccessToken,
        ) -> ProvisionResult<()> {
            Err(ProvisionError::unavailable("not implemented"))
        }

        async fn list_endpoints(
            &self,
            _service: &ServiceId,
            _name: &str,
            _token: &AccessToken,
        ) -> ProvisionResult<Vec<EndpointInfo>> {
            Err(ProvisionError::unavailable("not implemented"))
        }
    }

    #[tokio::test]
    async fn test_token_is_scoped_to_service() {
        let broker = CredentialBroker::new(RootCredential::new("root"));
        let token = broker
            .service_token(&TokenOnly, &ServiceId::new("pg"))
            .await
            .unwrap();
        assert_eq!(token.expose(), "root:pg");
    }

    #[tokio::test]
    async fn test_empty_credential_rejected() {
        let broker = CredentialBroker::new(RootCredential::new(""));
        let err = broker
            .service_token(&TokenOnly, &ServiceId::new("pg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmptyCredential));
    }

    #[tokio::test]
    async fn test_empty_service_rejected() {
        let broker = CredentialBroker::new(RootCredential::new("root"));
        let err = broker
            .service_token(&TokenOnly, &ServiceId::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmptyService));
    }
}
