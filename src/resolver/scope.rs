//! # Scope Resolver
//!
//! Decides whether a mapped resource is fetched inside a namespace or at
//! cluster level, from the namespaced flag discovery reports for it.

use super::discovery::DiscoverySnapshot;
use super::mapper::ResourceMapping;
use super::ResolveError;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Namespaced,
    Cluster,
}

impl Scope {
    #[must_use]
    pub fn is_namespaced(self) -> bool {
        matches!(self, Scope::Namespaced)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Namespaced => f.write_str("namespaced"),
            Scope::Cluster => f.write_str("cluster"),
        }
    }
}

/// Look up the scope of `mapping` in `snapshot`
///
/// The entry must match on joined group/version, resource name and kind.
///
/// # Errors
///
/// [`ResolveError::ScopeUnknown`] when no discovered entry matches, rather
/// than guessing a scope and fetching from the wrong place.
pub fn resolve_scope(
    snapshot: &DiscoverySnapshot,
    mapping: &ResourceMapping,
) -> Result<Scope, ResolveError> {
    let group_version = mapping.group_version();
    for (discovered_gv, resources) in snapshot.resource_lists() {
        if discovered_gv != group_version {
            continue;
        }
        if let Some(resource) = resources
            .iter()
            .find(|r| r.name == mapping.resource && r.kind == mapping.kind)
        {
            trace!(
                "{} {} namespaced: {}",
                group_version,
                mapping.resource,
                resource.namespaced
            );
            return Ok(if resource.namespaced {
                Scope::Namespaced
            } else {
                Scope::Cluster
            });
        }
    }

    Err(ResolveError::ScopeUnknown {
        group_version,
        resource: mapping.resource.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::discovery::{DiscoveredGroup, DiscoveredResource, DiscoveredVersion};

    fn core_snapshot() -> DiscoverySnapshot {
        DiscoverySnapshot::new(vec![DiscoveredGroup::new(
            "",
            vec![DiscoveredVersion::new(
                "v1",
                vec![
                    DiscoveredResource::namespaced("secrets", "Secret"),
                    DiscoveredResource::cluster_scoped("namespaces", "Namespace"),
                ],
            )],
        )])
    }

    fn mapping(group: &str, resource: &str, kind: &str) -> ResourceMapping {
        ResourceMapping {
            group: group.to_string(),
            version: "v1".to_string(),
            resource: resource.to_string(),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn test_secret_is_namespaced() {
        let scope = resolve_scope(&core_snapshot(), &mapping("", "secrets", "Secret")).unwrap();
        assert_eq!(scope, Scope::Namespaced);
    }

    #[test]
    fn test_namespace_is_cluster_scoped() {
        let scope =
            resolve_scope(&core_snapshot(), &mapping("", "namespaces", "Namespace")).unwrap();
        assert_eq!(scope, Scope::Cluster);
        assert!(!scope.is_namespaced());
    }

    #[test]
    fn test_kind_must_match_too() {
        let err = resolve_scope(&core_snapshot(), &mapping("", "secrets", "ConfigMap")).unwrap_err();
        assert!(matches!(err, ResolveError::ScopeUnknown { .. }));
    }

    #[test]
    fn test_group_prefix_must_match() {
        // "apps/v1" must not collide with the core "v1" entry
        let err =
            resolve_scope(&core_snapshot(), &mapping("apps", "secrets", "Secret")).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ScopeUnknown { ref group_version, .. } if group_version == "apps/v1"
        ));
    }
}
