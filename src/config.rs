//! # Controller Configuration
//!
//! Command line flags, each of which can also be supplied through an
//! environment variable (populated from the deployment manifest).

use crate::constants::{
    DEFAULT_CLUSTER_NAME, DEFAULT_HEALTH_PROBE_BIND_ADDRESS, DEFAULT_HUBCONFIG_SECRET_NAME,
    DEFAULT_HUBCONFIG_SECRET_NAMESPACE,
};
use clap::{Args, Parser, Subcommand};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WATCH_NAMESPACE must be set")]
    MissingWatchNamespace,
    #[error("invalid health probe bind address `{addr}`: {source}")]
    InvalidBindAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Parser)]
#[command(name = "cert-policy-controller", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub controller: ControllerConfig,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the controller (the default)
    Run,
    /// Resolve one manifest against the cluster and print the live object
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Manifest file (JSON or YAML, one object)
    #[arg(short, long)]
    pub file: PathBuf,
    /// Namespace used when the object turns out to be namespaced
    #[arg(short, long, default_value = "default")]
    pub namespace: String,
}

/// Controller-level configuration
#[derive(Debug, Clone, Args)]
pub struct ControllerConfig {
    /// Namespace(s) the controller watches, comma separated
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Load the hub kubeconfig and report status to the hub
    #[arg(long, env = "ENABLE_LEASE", default_value_t = false)]
    pub enable_lease: bool,

    /// Namespace of the hub kubeconfig secret
    #[arg(long, env = "HUBCONFIG_SECRET_NS", default_value = DEFAULT_HUBCONFIG_SECRET_NAMESPACE)]
    pub hubconfig_secret_ns: String,

    /// Name of the hub kubeconfig secret
    #[arg(long, env = "HUBCONFIG_SECRET_NAME", default_value = DEFAULT_HUBCONFIG_SECRET_NAME)]
    pub hubconfig_secret_name: String,

    /// Name of this managed cluster
    #[arg(long, env = "CLUSTER_NAME", default_value = DEFAULT_CLUSTER_NAME)]
    pub cluster_name: String,

    /// Address the probe and metrics endpoint binds to
    #[arg(long, env = "HEALTH_PROBE_BIND_ADDRESS", default_value = DEFAULT_HEALTH_PROBE_BIND_ADDRESS)]
    pub health_probe_bind_address: String,
}

impl ControllerConfig {
    /// Watched namespaces; an empty entry list means cluster scope
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingWatchNamespace`] when the flag is unset.
    pub fn watch_namespaces(&self) -> Result<Vec<String>, ConfigError> {
        let raw = self
            .watch_namespace
            .as_deref()
            .ok_or(ConfigError::MissingWatchNamespace)?;
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Socket address for the probe server; `:8081` binds every interface
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBindAddress`] when the address does not parse.
    pub fn health_probe_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = &self.health_probe_bind_address;
        let full = if addr.starts_with(':') {
            format!("0.0.0.0{addr}")
        } else {
            addr.clone()
        };
        full.parse().map_err(|source| ConfigError::InvalidBindAddress {
            addr: addr.clone(),
            source,
        })
    }
}

/// Namespace the controller pod runs in
///
/// `Ok(None)` when the service account file does not exist, i.e. the process
/// is not running inside a cluster.
///
/// # Errors
///
/// Any read failure other than a missing file.
pub fn operator_namespace(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(ns) => Ok(Some(ns.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
