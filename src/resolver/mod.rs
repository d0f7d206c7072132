//! # Generic Resource Resolver
//!
//! Reads the live state of an object known only as serialized manifest bytes.
//!
//! ## Pipeline
//!
//! 1. **Decode** - parse the bytes into a [`GenericObject`] and its group/version/kind
//! 2. **Discover** - snapshot the API server's resource topology
//! 3. **Map** - find the REST resource serving that kind
//! 4. **Scope** - decide between a namespaced and a cluster-level get
//! 5. **Fetch** - get the object by name through a dynamic client
//!
//! Nothing here retries. Discovery failures are marked fatal via
//! [`ResolveError::is_fatal`]; the process entry point decides whether to exit.

pub mod discovery;
pub mod fetch;
pub mod manifest;
pub mod mapper;
pub mod scope;

pub use discovery::{join_group_version, DiscoverySnapshot};
pub use fetch::fetch_object;
pub use manifest::{decode_manifest, DecodedManifest, GenericObject, ManifestError};
pub use mapper::{rest_mapping, ResourceMapping};
pub use scope::{resolve_scope, Scope};

use crate::observability::metrics;
use kube::Client;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, trace};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("decoding error, please check your policy file: {0}")]
    Decode(#[from] ManifestError),
    #[error("API discovery failed: {0}")]
    Discovery(#[source] kube::Error),
    #[error("no resource mapping found for kind {kind} in {group_version}")]
    Mapping { group_version: String, kind: String },
    #[error("scope of {resource} in {group_version} is unknown to discovery")]
    ScopeUnknown {
        group_version: String,
        resource: String,
    },
    #[error("{resource} `{name}` not found in namespace {namespace}")]
    NotFound {
        resource: String,
        namespace: String,
        name: String,
    },
    #[error("failed to get {resource} `{name}`: {source}")]
    Fetch {
        resource: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl ResolveError {
    /// The resolver cannot work at all without discovery
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::Discovery(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }

    /// Short label for metrics
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            ResolveError::Decode(_) => "decode",
            ResolveError::Discovery(_) => "discovery",
            ResolveError::Mapping { .. } => "mapping",
            ResolveError::ScopeUnknown { .. } => "scope_unknown",
            ResolveError::NotFound { .. } => "not_found",
            ResolveError::Fetch { .. } => "fetch",
        }
    }
}

/// Resolves manifests against the cluster reachable through `client`
#[derive(Clone)]
pub struct ObjectResolver {
    client: Client,
}

impl std::fmt::Debug for ObjectResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectResolver").finish_non_exhaustive()
    }
}

impl ObjectResolver {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch the live counterpart of the object encoded in `data`
    ///
    /// Runs a fresh discovery round for every call. `Ok(None)` means a
    /// cluster-scoped object does not exist; a missing namespaced object is
    /// [`ResolveError::NotFound`].
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub async fn get_generic_object(
        &self,
        data: &[u8],
        namespace: &str,
    ) -> Result<Option<GenericObject>, ResolveError> {
        let start = Instant::now();
        let result = self.discover_and_resolve(data, namespace).await;
        metrics::observe_resolution(&result, start.elapsed().as_secs_f64());
        result
    }

    /// Same pipeline as [`Self::get_generic_object`] against an existing snapshot
    ///
    /// Lets callers that resolve many manifests in one pass share a single
    /// discovery round.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`]; never [`ResolveError::Discovery`].
    pub async fn resolve_with_snapshot(
        &self,
        snapshot: &DiscoverySnapshot,
        data: &[u8],
        namespace: &str,
    ) -> Result<Option<GenericObject>, ResolveError> {
        let start = Instant::now();
        let result = self.resolve(snapshot, data, namespace).await;
        metrics::observe_resolution(&result, start.elapsed().as_secs_f64());
        result
    }

    /// One discovery round, as used by [`Self::get_generic_object`]
    ///
    /// # Errors
    ///
    /// [`ResolveError::Discovery`] when any discovery request fails.
    pub async fn discover(&self) -> Result<DiscoverySnapshot, ResolveError> {
        DiscoverySnapshot::discover(&self.client).await.map_err(|e| {
            error!("API discovery failed: {}", e);
            metrics::increment_discovery_errors();
            ResolveError::Discovery(e)
        })
    }

    async fn discover_and_resolve(
        &self,
        data: &[u8],
        namespace: &str,
    ) -> Result<Option<GenericObject>, ResolveError> {
        let snapshot = self.discover().await?;
        self.resolve(&snapshot, data, namespace).await
    }

    async fn resolve(
        &self,
        snapshot: &DiscoverySnapshot,
        data: &[u8],
        namespace: &str,
    ) -> Result<Option<GenericObject>, ResolveError> {
        trace!("reading raw object: {}", String::from_utf8_lossy(data));

        let decoded = decode_manifest(data).inspect_err(|e| {
            error!("decoding error, please check your policy file: {}", e);
        })?;

        let mapping = rest_mapping(snapshot, &decoded.type_identity).inspect_err(|e| {
            error!("mapping error from raw object: {}", e);
            let group = &decoded.type_identity.group;
            if let Some(preferred) = snapshot.preferred_version(group) {
                debug!("group `{}` is served, preferred version {}", group, preferred);
            }
        })?;
        debug!("mapping found from raw object: {:?}", mapping);

        let scope = resolve_scope(snapshot, &mapping)?;
        debug!("{} {} is {}", mapping.group_version(), mapping.kind, scope);

        let name = decoded.object.name()?;
        fetch_object(&self.client, &mapping, scope, namespace, name).await
    }
}
