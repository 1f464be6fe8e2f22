//! Reconciliation driver
//!
//! The four-operation contract the host orchestrator calls per declared
//! unit. Each operation runs a strictly sequential chain of control-plane
//! calls: token fetch, provision call, optional endpoint query. There is no
//! internal parallelism and no retry policy beyond a single token refresh
//! when a provisioning call reports the token rejected.
//!
//! State moves `Absent → Present` on a successful create and
//! `Present → Absent` on delete. A failed create leaves no record; a
//! delete of an already-absent instance succeeds.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::broker::CredentialBroker;
use crate::error::{ProvisionError, ReconcileError, ReconcileErrorKind, ReconcileResult};
use crate::fields::DeclaredConfig;
use crate::instance::InstanceRecord;
use crate::projector::{to_properties, to_record};
use crate::registry::ServiceCatalog;
use crate::resolver::resolve_endpoints;
use crate::traits::ControlPlane;
use crate::types::{Operation, RootCredential, ServiceId};

/// Caller-supplied limits applied to every control-plane call.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerOptions {
    /// Upper bound for a single network call. `None` leaves timing to the
    /// control-plane client.
    pub call_timeout: Option<Duration>,

    /// Cancellation handle; cancelling aborts the current call with a
    /// distinct error kind instead of blocking.
    pub cancellation: CancellationToken,
}

impl ReconcilerOptions {
    /// Create options with no timeout and a never-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every control-plane call by the given timeout.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Sequences credential brokerage, provisioning, endpoint resolution, and
/// attribute projection for every declared unit.
///
/// Reconciliations of distinct declared names are independent and may run
/// concurrently; the host is responsible for serializing operations
/// against a single declared name.
pub struct Reconciler<C> {
    control: Arc<C>,
    broker: CredentialBroker,
    catalog: ServiceCatalog,
    options: ReconcilerOptions,
}

impl<C: ControlPlane> Reconciler<C> {
    /// Create a reconciler over a control plane, root credential, and
    /// service catalog.
    pub fn new(control: Arc<C>, credential: RootCredential, catalog: ServiceCatalog) -> Self {
        Self {
            control,
            broker: CredentialBroker::new(credential),
            catalog,
            options: ReconcilerOptions::default(),
        }
    }

    /// Replace the call limits.
    #[must_use]
    pub fn with_options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Provision an instance from its declared configuration.
    ///
    /// On success the returned record is the canonical remote
    /// representation merged with declared pass-through fields. On any
    /// failure no record exists and the remote is expected not to have
    /// partially committed.
    #[instrument(skip(self, declared), fields(service = %service, name = declared.name()))]
    pub async fn create(
        &self,
        service: &ServiceId,
        declared: &DeclaredConfig,
    ) -> ReconcileResult<InstanceRecord> {
        let fail = |kind: ReconcileErrorKind| {
            ReconcileError::new(service.clone(), declared.name(), Operation::Create, kind)
        };

        let schema = self
            .catalog
            .get(service)
            .ok_or_else(|| fail(ReconcileErrorKind::UnknownService(service.clone())))?;

        let properties = to_properties(schema, declared).map_err(|e| fail(e.into()))?;

        let mut token = self
            .guard(self.broker.service_token(self.control.as_ref(), service))
            .await
            .map_err(&fail)?;

        let raw = match self
            .guard(self.control.create_instance(service, &token, &properties))
            .await
        {
            Err(kind) if is_unauthorized(&kind) => {
                warn!(service = %service, "token rejected during create, refreshing once");
                token = self
                    .guard(self.broker.service_token(self.control.as_ref(), service))
                    .await
                    .map_err(&fail)?;
                self.guard(self.control.create_instance(service, &token, &properties))
                    .await
                    .map_err(&fail)?
            }
            Err(kind) => return Err(fail(kind)),
            Ok(raw) => raw,
        };

        let endpoints = match self
            .guard(resolve_endpoints(
                self.control.as_ref(),
                schema,
                raw.name(),
                &token,
            ))
            .await
        {
            Err(kind) if is_unauthorized(&kind) => {
                warn!(service = %service, "token rejected during endpoint query, refreshing once");
                token = self
                    .guard(self.broker.service_token(self.control.as_ref(), service))
                    .await
                    .map_err(&fail)?;
                self.guard(resolve_endpoints(
                    self.control.as_ref(),
                    schema,
                    raw.name(),
                    &token,
                ))
                .await
                .map_err(&fail)?
            }
            Err(kind) => return Err(fail(kind)),
            Ok(endpoints) => endpoints,
        };

        let record = to_record(schema, &raw, declared, endpoints).map_err(|e| fail(e.into()))?;
        info!(service = %service, name = %record.name, url = %record.url, "instance created");
        Ok(record)
    }

    /// Return the stored record unchanged.
    ///
    /// Local state is authoritative and never refreshed from the remote:
    /// the control plane is not queried, and drift in remote state is
    /// invisible until the host destroys and recreates the instance.
    pub async fn read(&self, record: &InstanceRecord) -> ReconcileResult<InstanceRecord> {
        Ok(record.clone())
    }

    /// Always fails: in-place updates are unsupported.
    ///
    /// Any declared-configuration change requires the host to destroy and
    /// recreate the instance.
    pub async fn update(
        &self,
        service: &ServiceId,
        record: &InstanceRecord,
        _declared: &DeclaredConfig,
    ) -> ReconcileResult<InstanceRecord> {
        Err(ReconcileError::new(
            service.clone(),
            record.name.clone(),
            Operation::Update,
            ReconcileErrorKind::UpdateUnsupported,
        ))
    }

    /// Tear down an instance.
    ///
    /// Idempotent: an instance the control plane no longer knows about is
    /// treated as already deleted, so host-level retries of delete
    /// converge instead of failing.
    #[instrument(skip(self, record), fields(service = %service, name = %record.name))]
    pub async fn delete(
        &self,
        service: &ServiceId,
        record: &InstanceRecord,
    ) -> ReconcileResult<()> {
        let fail = |kind: ReconcileErrorKind| {
            ReconcileError::new(service.clone(), record.name.clone(), Operation::Delete, kind)
        };

        if self.catalog.get(service).is_none() {
            return Err(fail(ReconcileErrorKind::UnknownService(service.clone())));
        }

        let mut token = self
            .guard(self.broker.service_token(self.control.as_ref(), service))
            .await
            .map_err(&fail)?;

        let result = match self
            .guard(self.control.remove_instance(service, &record.name, &token))
            .await
        {
            Err(kind) if is_unauthorized(&kind) => {
                warn!(service = %service, "token rejected during delete, refreshing once");
                token = self
                    .guard(self.broker.service_token(self.control.as_ref(), service))
                    .await
                    .map_err(&fail)?;
                self.guard(self.control.remove_instance(service, &record.name, &token))
                    .await
            }
            other => other,
        };

        match result {
            Ok(()) => {
                info!(service = %service, name = %record.name, "instance removed");
                Ok(())
            }
            Err(ReconcileErrorKind::Provision(p)) if p.is_not_found() => {
                debug!(service = %service, name = %record.name, "instance already absent");
                Ok(())
            }
            Err(kind) => Err(fail(kind)),
        }
    }

    /// Run a control-plane call under the configured timeout and
    /// cancellation limits.
    async fn guard<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, ReconcileErrorKind>
    where
        E: Into<ReconcileErrorKind>,
    {
        let bounded = async {
            match self.options.call_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result.map_err(Into::into),
                    Err(_) => Err(ProvisionError::Timeout {
                        timeout_secs: timeout.as_secs(),
                    }
                    .into()),
                },
                None => call.await.map_err(Into::into),
            }
        };

        tokio::select! {
            () = self.options.cancellation.cancelled() => {
                Err(ProvisionError::Cancelled.into())
            }
            result = bounded => result,
        }
    }
}

fn is_unauthorized(kind: &ReconcileErrorKind) -> bool {
    matches!(kind, ReconcileErrorKind::Provision(p) if p.is_unauthorized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ProvisionResult};
    use crate::fields::PropertyBag;
    use crate::instance::{EndpointInfo, RawInstance};
    use crate::schema::ServiceSchema;
    use crate::types::AccessToken;
    use async_trait::async_trait;

    // Control plane that never answers; used to exercise the call limits.
    struct HangingControlPlane;

    #[async_trait]
    impl ControlPlane for HangingControlPlane {
        async fn exchange_token(
            &self,
            _credential: &RootCredential,
            _service: &ServiceId,
        ) -> Result<AccessToken, AuthError> {
            std::future::pending().await
        }

        async fn create_instance(
            &self,
            _service: &ServiceId,
            _token: &AccessToken,
            _properties: &PropertyBag,
        ) -> ProvisionResult<RawInstance> {
            std::future::pending().await
        }

        async fn remove_instance(
            &self,
            _service: &ServiceId,
            _name: &str,
            _token: &AccessToken,
        ) -> ProvisionResult<()> {
            std::future::pending().await
        }

        async fn list_endpoints(
            &self,
            _service: &ServiceId,
            _name: &str,
            _token: &AccessToken,
        ) -> ProvisionResult<Vec<EndpointInfo>> {
            std::future::pending().await
        }
    }

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::from_schemas([ServiceSchema::new("pg")]).unwrap()
    }

    fn hanging_reconciler() -> Reconciler<HangingControlPlane> {
        Reconciler::new(
            Arc::new(HangingControlPlane),
            RootCredential::new("root"),
            catalog(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_surfaces_as_timeout() {
        let reconciler = hanging_reconciler().with_options(
            ReconcilerOptions::new().with_call_timeout(Duration::from_secs(5)),
        );

        let err = reconciler
            .create(&ServiceId::new("pg"), &DeclaredConfig::new("demo"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            ReconcileErrorKind::Provision(ProvisionError::Timeout { timeout_secs: 5 })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_surfaces_as_cancelled() {
        let cancellation = CancellationToken::new();
        let reconciler = hanging_reconciler().with_options(
            ReconcilerOptions::new().with_cancellation(cancellation.clone()),
        );

        let service_id = ServiceId::new("pg");
        let declared = DeclaredConfig::new("demo");
        let create = reconciler.create(&service_id, &declared);
        cancellation.cancel();

        let err = create.await.unwrap_err();
        assert!(matches!(
            err.kind(),
            ReconcileErrorKind::Provision(ProvisionError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_unknown_service_rejected() {
        let reconciler = hanging_reconciler();
        let err = reconciler
            .create(&ServiceId::new("mystery"), &DeclaredConfig::new("demo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind(),
            ReconcileErrorKind::UnknownService(_)
        ));
        assert_eq!(err.operation, Operation::Create);
    }

    #[tokio::test]
    async fn test_update_is_unsupported() {
        let reconciler = hanging_reconciler();
        let record = InstanceRecord {
            name: "demo".to_string(),
            url: "https://demo.example.test".to_string(),
            external_address: String::new(),
            external_port: 0,
            endpoints: Vec::new(),
            fields: PropertyBag::new(),
        };

        let err = reconciler
            .update(&ServiceId::new("pg"), &record, &DeclaredConfig::new("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ReconcileErrorKind::UpdateUnsupported));
        assert_eq!(err.operation, Operation::Update);
    }

    #[tokio::test]
    async fn test_read_returns_local_state() {
        let reconciler = hanging_reconciler();
        let record = InstanceRecord {
            name: "demo".to_string(),
            url: "https://demo.example.test".to_string(),
            external_address: String::new(),
            external_port: 0,
            endpoints: Vec::new(),
            fields: PropertyBag::new(),
        };

        // No control-plane call is made, so even the hanging plane answers.
        let read = reconciler.read(&record).await.unwrap();
        assert_eq!(read, record);
    }
}
