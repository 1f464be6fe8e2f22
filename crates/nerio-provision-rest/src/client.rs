//! REST control-plane client
//!
//! Implements the [`ControlPlane`] contract over HTTP. Every response is
//! decoded through a typed step that fails closed: a create response
//! without a string `name` and `url` is a malformed-response error, never
//! an empty substitute. The client performs no retries of its own; the
//! single token-refresh retry lives in the reconciliation driver.

use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use nerio_provision::error::{AuthError, ProvisionError, ProvisionResult};
use nerio_provision::fields::{FieldValue, PropertyBag};
use nerio_provision::instance::{EndpointInfo, RawInstance};
use nerio_provision::traits::ControlPlane;
use nerio_provision::types::{AccessToken, RootCredential, ServiceId};

use crate::config::{RestConfig, RestConfigError};

/// REST client for the nerio control plane.
pub struct RestControlPlane {
    config: RestConfig,
    client: Client,
}

impl std::fmt::Debug for RestControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestControlPlane")
            .field("config", &self.config.redacted())
            .finish()
    }
}

impl RestControlPlane {
    /// Create a client from a validated configuration.
    pub fn new(config: RestConfig) -> Result<Self, RestConfigError> {
        config.validate()?;
        let client = Self::build_client(&config)?;
        Ok(Self { config, client })
    }

    fn build_client(config: &RestConfig) -> Result<Client, RestConfigError> {
        let mut builder = Client::builder()
            .timeout(config.connection.read_timeout())
            .connect_timeout(config.connection.connection_timeout());

        if !config.tls.verify_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(RestConfigError::ClientBuild)
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn tokens_url(&self, service: &ServiceId) -> String {
        format!("{}/v1/services/{service}/tokens", self.base())
    }

    fn instances_url(&self, service: &ServiceId) -> String {
        format!("{}/v1/services/{service}/instances", self.base())
    }

    fn instance_url(&self, service: &ServiceId, name: &str) -> String {
        format!("{}/{name}", self.instances_url(service))
    }

    fn endpoints_url(&self, service: &ServiceId, name: &str) -> String {
        format!("{}/endpoints", self.instance_url(service, name))
    }

    /// Build a request with the bearer value, correlation id, and any
    /// configured default headers.
    fn request(&self, method: Method, url: &str, bearer: &str) -> reqwest::RequestBuilder {
        let request_id = Uuid::new_v4();
        debug!(%request_id, method = %method, url, "sending control-plane request");

        let mut builder = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
            .header("x-request-id", request_id.to_string());

        for (name, value) in &self.config.default_headers {
            builder = builder.header(name, value);
        }

        builder
    }

    /// Pull a human-readable message out of an error body.
    fn extract_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| body.to_string())
    }

    fn error_for_status(status: StatusCode, body: &str, name: Option<&str>) -> ProvisionError {
        let message = Self::extract_message(body);
        let name = name.unwrap_or("unknown");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProvisionError::unauthorized(message)
            }
            StatusCode::NOT_FOUND => ProvisionError::not_found(name),
            StatusCode::CONFLICT => ProvisionError::conflict(name),
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => ProvisionError::unavailable(message),
            _ => ProvisionError::unavailable(format!("HTTP {status}: {message}")),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> ProvisionError {
        if error.is_timeout() {
            ProvisionError::Timeout {
                timeout_secs: self.config.connection.read_timeout_secs,
            }
        } else {
            ProvisionError::unavailable_with_source("control-plane request failed", error)
        }
    }

    /// Decode a create response, failing closed on anything the contract
    /// does not allow.
    fn decode_instance(body: &str) -> ProvisionResult<RawInstance> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            ProvisionError::malformed(format!("create response is not valid JSON: {e}"))
        })?;

        let object = value
            .as_object()
            .ok_or_else(|| ProvisionError::malformed("create response is not a JSON object"))?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProvisionError::malformed("create response missing string field 'name'"))?;

        let url = object
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProvisionError::malformed("create response missing string field 'url'"))?;

        let mut raw = RawInstance::new(name, url);
        for (key, val) in object {
            if key == "name" || key == "url" {
                continue;
            }
            match FieldValue::from_json(val) {
                Some(field) => raw = raw.with_extra(key.clone(), field),
                None => trace!(field = %key, "skipping non-primitive echoed field"),
            }
        }

        Ok(raw)
    }
}

#[async_trait]
impl ControlPlane for RestControlPlane {
    #[instrument(skip(self, credential), fields(service = %service))]
    async fn exchange_token(
        &self,
        credential: &RootCredential,
        service: &ServiceId,
    ) -> Result<AccessToken, AuthError> {
        let url = self.tokens_url(service);

        let response = self
            .request(Method::POST, &url, credential.expose())
            .send()
            .await
            .map_err(|e| {
                AuthError::exchange_with_source(service.clone(), "token exchange request failed", e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthError::exchange_with_source(
                service.clone(),
                "failed to read token exchange response",
                e,
            )
        })?;

        if !status.is_success() {
            return Err(AuthError::exchange(
                service.clone(),
                format!("HTTP {status}: {}", Self::extract_message(&body)),
            ));
        }

        serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("access_token")
                    .and_then(Value::as_str)
                    .map(AccessToken::new)
            })
            .ok_or_else(|| {
                AuthError::exchange(
                    service.clone(),
                    "response did not contain an access token",
                )
            })
    }

    #[instrument(skip(self, token, properties), fields(service = %service))]
    async fn create_instance(
        &self,
        service: &ServiceId,
        token: &AccessToken,
        properties: &PropertyBag,
    ) -> ProvisionResult<RawInstance> {
        let url = self.instances_url(service);
        let declared_name = properties.get("name").and_then(FieldValue::as_str);

        let response = self
            .request(Method::POST, &url, token.expose())
            .json(&properties.to_json())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Self::error_for_status(status, &body, declared_name));
        }

        Self::decode_instance(&body)
    }

    #[instrument(skip(self, token), fields(service = %service, name))]
    async fn remove_instance(
        &self,
        service: &ServiceId,
        name: &str,
        token: &AccessToken,
    ) -> ProvisionResult<()> {
        let url = self.instance_url(service, name);

        let response = self
            .request(Method::DELETE, &url, token.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::error_for_status(status, &body, Some(name)));
        }

        Ok(())
    }

    #[instrument(skip(self, token), fields(service = %service, name))]
    async fn list_endpoints(
        &self,
        service: &ServiceId,
        name: &str,
        token: &AccessToken,
    ) -> ProvisionResult<Vec<EndpointInfo>> {
        let url = self.endpoints_url(service, name);

        let response = self
            .request(Method::GET, &url, token.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Self::error_for_status(status, &body, Some(name)));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProvisionError::malformed(format!("endpoint list is not decodable: {e}"))
        })
    }
}
