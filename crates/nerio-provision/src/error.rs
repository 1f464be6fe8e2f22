//! Provisioning framework error types
//!
//! Three error families mirror the three places an operation can fail:
//! token exchange ([`AuthError`]), control-plane calls ([`ProvisionError`]),
//! and attribute projection ([`ProjectionError`]). The driver wraps whichever
//! occurs in a [`ReconcileError`] carrying the service identifier, declared
//! name, and operation so the host can render a diagnostic.

use thiserror::Error;

use crate::types::{Operation, ServiceId};

/// Error during token exchange with the control plane.
///
/// Always fatal for the current operation; the broker performs no retries.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The exchange call itself failed (transport, rejection, or a
    /// response without a usable token).
    #[error("token exchange failed for service '{service}': {message}")]
    Exchange {
        service: ServiceId,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The configured root credential is empty.
    #[error("root credential must not be empty")]
    EmptyCredential,

    /// The service identifier is empty.
    #[error("service identifier must not be empty")]
    EmptyService,
}

impl AuthError {
    /// Create an exchange error.
    pub fn exchange(service: ServiceId, message: impl Into<String>) -> Self {
        AuthError::Exchange {
            service,
            message: message.into(),
            source: None,
        }
    }

    /// Create an exchange error with an underlying cause.
    pub fn exchange_with_source(
        service: ServiceId,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AuthError::Exchange {
            service,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Error from a control-plane provisioning call.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The service-scoped token was rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// An instance with the declared name already exists.
    #[error("instance '{name}' already exists")]
    Conflict { name: String },

    /// No instance with the given name exists.
    #[error("instance '{name}' not found")]
    NotFound { name: String },

    /// The control plane returned a response the contract does not allow,
    /// e.g. a create response without a `name` or `url`.
    #[error("malformed control-plane response: {message}")]
    MalformedResponse { message: String },

    /// The control plane could not be reached or reported a server-side
    /// failure.
    #[error("control plane unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The call exceeded the caller-supplied timeout.
    #[error("call timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl ProvisionError {
    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ProvisionError::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a conflict error for a declared name.
    pub fn conflict(name: impl Into<String>) -> Self {
        ProvisionError::Conflict { name: name.into() }
    }

    /// Create a not-found error for a declared name.
    pub fn not_found(name: impl Into<String>) -> Self {
        ProvisionError::NotFound { name: name.into() }
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        ProvisionError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProvisionError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unavailable error with an underlying cause.
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProvisionError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check whether the token was rejected.
    ///
    /// The driver uses this to decide on the single token-refresh retry.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProvisionError::Unauthorized { .. })
    }

    /// Check whether the instance was reported absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProvisionError::NotFound { .. })
    }

    /// Check if this error was caused by a temporary condition.
    ///
    /// Transient errors may resolve themselves; whether to retry is the
    /// host's decision, never this crate's.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProvisionError::Unavailable { .. } | ProvisionError::Timeout { .. }
        )
    }

    /// Get an error code for classification in logs and diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProvisionError::Unauthorized { .. } => "UNAUTHORIZED",
            ProvisionError::Conflict { .. } => "CONFLICT",
            ProvisionError::NotFound { .. } => "NOT_FOUND",
            ProvisionError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            ProvisionError::Unavailable { .. } => "UNAVAILABLE",
            ProvisionError::Timeout { .. } => "TIMEOUT",
            ProvisionError::Cancelled => "CANCELLED",
        }
    }
}

/// Error projecting between a declared configuration and the remote
/// representation.
///
/// Projection failures are always fatal and never recovered locally: a
/// missing required field or a mistyped remote value means the declared
/// state cannot be represented faithfully.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A field the mapping table marks as required has no declared value.
    #[error("required field '{field}' is missing from the declared configuration")]
    MissingField { field: String },

    /// A value had a different type than the mapping table specifies.
    #[error("field '{field}' expected a {expected} value, got {found}")]
    UnexpectedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A declared field has no entry in the mapping table.
    #[error("field '{field}' is not covered by the mapping table")]
    UnmappedField { field: String },
}

/// What went wrong inside a reconciliation operation.
#[derive(Debug, Error)]
pub enum ReconcileErrorKind {
    /// Token exchange failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A control-plane call failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Attribute projection failed.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The service identifier is not registered in the catalog.
    #[error("service '{0}' is not registered in the catalog")]
    UnknownService(ServiceId),

    /// In-place updates are not supported; the host must destroy and
    /// recreate the instance.
    #[error("update is not supported; destroy and recreate the instance")]
    UpdateUnsupported,
}

/// A reconciliation failure with enough context for a user-facing
/// diagnostic: which operation, on which service, for which declared name.
#[derive(Debug, Error)]
#[error("{operation} of instance '{name}' (service '{service}') failed: {kind}")]
pub struct ReconcileError {
    /// The service identifier the operation targeted.
    pub service: ServiceId,
    /// The declared instance name.
    pub name: String,
    /// The lifecycle operation that failed.
    pub operation: Operation,
    /// The underlying failure.
    #[source]
    pub kind: ReconcileErrorKind,
}

impl ReconcileError {
    /// Attach operation context to an underlying failure.
    pub fn new(
        service: ServiceId,
        name: impl Into<String>,
        operation: Operation,
        kind: impl Into<ReconcileErrorKind>,
    ) -> Self {
        Self {
            service,
            name: name.into(),
            operation,
            kind: kind.into(),
        }
    }

    /// Get the underlying failure.
    pub fn kind(&self) -> &ReconcileErrorKind {
        &self.kind
    }
}

/// Result type for control-plane calls.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProvisionError::unavailable("down").is_transient());
        assert!(ProvisionError::Timeout { timeout_secs: 30 }.is_transient());
        assert!(!ProvisionError::unauthorized("bad token").is_transient());
        assert!(!ProvisionError::conflict("demo").is_transient());
        assert!(!ProvisionError::Cancelled.is_transient());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ProvisionError::unauthorized("x").error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(ProvisionError::not_found("x").error_code(), "NOT_FOUND");
        assert_eq!(
            ProvisionError::malformed("no url").error_code(),
            "MALFORMED_RESPONSE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ProvisionError::conflict("demo");
        assert_eq!(err.to_string(), "instance 'demo' already exists");

        let err = AuthError::exchange(ServiceId::new("pg"), "rejected");
        assert_eq!(
            err.to_string(),
            "token exchange failed for service 'pg': rejected"
        );
    }

    #[test]
    fn test_reconcile_error_context() {
        let err = ReconcileError::new(
            ServiceId::new("pg"),
            "demo",
            Operation::Create,
            ProvisionError::unavailable("connection refused"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("create"));
        assert!(rendered.contains("demo"));
        assert!(rendered.contains("pg"));
        assert!(matches!(
            err.kind(),
            ReconcileErrorKind::Provision(ProvisionError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ProvisionError::unavailable_with_source("connect failed", io);
        if let ProvisionError::Unavailable { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected Unavailable variant");
        }
    }
}
