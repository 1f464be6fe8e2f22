//! # REST Control-Plane Client
//!
//! HTTP implementation of the `nerio-provision` [`ControlPlane`] contract.
//!
//! ## Example
//!
//! ```ignore
//! use nerio_provision::prelude::*;
//! use nerio_provision_rest::{RestConfig, RestControlPlane};
//! use std::sync::Arc;
//!
//! let control = RestControlPlane::new(RestConfig::new("https://api.nerio.example"))?;
//! let reconciler = Reconciler::new(Arc::new(control), root_credential, catalog);
//! ```
//!
//! [`ControlPlane`]: nerio_provision::traits::ControlPlane

pub mod client;
pub mod config;

pub use client::RestControlPlane;
pub use config::{ConnectionSettings, RestConfig, RestConfigError, TlsConfig};
