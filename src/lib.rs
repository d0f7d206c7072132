//! Cert Policy Controller Library
//!
//! Core of the certificate policy controller: resolving policy-referenced
//! manifests against the live cluster, and bootstrapping credentials for the
//! hub cluster from a kubeconfig bundle secret.
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod context;
pub mod hub;
pub mod observability;
pub mod resolver;
pub mod server;

pub use context::ControllerContext;
pub use hub::{HubConfigCache, HubConfigError};
pub use resolver::{GenericObject, ObjectResolver, ResolveError};

