//! # REST Mapper
//!
//! Maps a type identity (group, version, kind) onto the REST resource that
//! serves it, using a discovery snapshot.

use super::discovery::{join_group_version, DiscoverySnapshot};
use super::ResolveError;
use kube::core::{ApiResource, GroupVersionKind};

/// REST-addressable form of a type identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMapping {
    pub group: String,
    pub version: String,
    /// Plural resource name (e.g. `certificatepolicies`)
    pub resource: String,
    pub kind: String,
}

impl ResourceMapping {
    #[must_use]
    pub fn group_version(&self) -> String {
        join_group_version(&self.group, &self.version)
    }

    #[must_use]
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&self.group, &self.version, &self.kind)
    }

    /// Dynamic API descriptor used to build a client bound to this group/version
    #[must_use]
    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk(), &self.resource)
    }
}

/// Find the resource serving `gvk`
///
/// Group, version and kind must all match a discovered resource; a kind served
/// only under another version of the group is not substituted.
///
/// # Errors
///
/// [`ResolveError::Mapping`] when the cluster does not serve this type.
pub fn rest_mapping(
    snapshot: &DiscoverySnapshot,
    gvk: &GroupVersionKind,
) -> Result<ResourceMapping, ResolveError> {
    snapshot
        .groups()
        .iter()
        .filter(|group| group.name == gvk.group)
        .flat_map(|group| group.versions.iter())
        .filter(|version| version.version == gvk.version)
        .flat_map(|version| version.resources.iter())
        .find(|resource| resource.kind == gvk.kind)
        .map(|resource| ResourceMapping {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            resource: resource.name.clone(),
            kind: resource.kind.clone(),
        })
        .ok_or_else(|| ResolveError::Mapping {
            group_version: join_group_version(&gvk.group, &gvk.version),
            kind: gvk.kind.clone(),
        })
}
