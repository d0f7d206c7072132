//! # Discovery
//!
//! A point-in-time snapshot of every API group/version the API server serves,
//! with the kind and scope of each top-level resource.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use tracing::{debug, trace};

/// Join a group and version the way `apiVersion` strings are written
///
/// The core group has an empty name, so its group/version is just the version.
#[must_use]
pub fn join_group_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{group}/{version}")
    }
}

/// A top-level resource served under one group/version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    /// Plural resource name used in REST paths (e.g. `secrets`)
    pub name: String,
    pub kind: String,
    pub namespaced: bool,
}

impl DiscoveredResource {
    #[must_use]
    pub fn namespaced(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced: true,
        }
    }

    #[must_use]
    pub fn cluster_scoped(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredVersion {
    pub version: String,
    pub resources: Vec<DiscoveredResource>,
}

impl DiscoveredVersion {
    #[must_use]
    pub fn new(version: &str, resources: Vec<DiscoveredResource>) -> Self {
        Self {
            version: version.to_string(),
            resources,
        }
    }

    /// Keep top-level resources only; `pods/log` style subresources are dropped
    #[must_use]
    pub fn from_resource_list(version: &str, list: APIResourceList) -> Self {
        let resources = list
            .resources
            .into_iter()
            .filter(|r| !r.name.contains('/'))
            .map(|r| DiscoveredResource {
                name: r.name,
                kind: r.kind,
                namespaced: r.namespaced,
            })
            .collect();
        Self::new(version, resources)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGroup {
    /// Group name, empty for the core group
    pub name: String,
    pub preferred_version: Option<String>,
    pub versions: Vec<DiscoveredVersion>,
}

impl DiscoveredGroup {
    #[must_use]
    pub fn new(name: &str, versions: Vec<DiscoveredVersion>) -> Self {
        Self {
            name: name.to_string(),
            preferred_version: versions.first().map(|v| v.version.clone()),
            versions,
        }
    }
}

/// Resource topology as reported by one round of discovery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySnapshot {
    groups: Vec<DiscoveredGroup>,
}

impl DiscoverySnapshot {
    #[must_use]
    pub fn new(groups: Vec<DiscoveredGroup>) -> Self {
        Self { groups }
    }

    /// Query the legacy discovery endpoints (`/api`, `/apis`) for the full topology
    ///
    /// Not cached: every call is a fresh round trip per group/version.
    ///
    /// # Errors
    ///
    /// Any failed discovery request fails the whole snapshot.
    pub async fn discover(client: &Client) -> Result<Self, kube::Error> {
        let mut groups = Vec::new();

        let core_versions = client.list_core_api_versions().await?.versions;
        let mut core = Vec::with_capacity(core_versions.len());
        for version in &core_versions {
            let list = client.list_core_api_resources(version).await?;
            core.push(DiscoveredVersion::from_resource_list(version, list));
        }
        groups.push(DiscoveredGroup::new("", core));

        for group in client.list_api_groups().await?.groups {
            let mut versions = Vec::with_capacity(group.versions.len());
            for version in &group.versions {
                trace!("discovering resources for {}", version.group_version);
                let list = client
                    .list_api_group_resources(&version.group_version)
                    .await?;
                versions.push(DiscoveredVersion::from_resource_list(&version.version, list));
            }
            groups.push(DiscoveredGroup {
                preferred_version: group.preferred_version.map(|v| v.version),
                name: group.name,
                versions,
            });
        }

        debug!("discovery found {} API groups", groups.len());
        Ok(Self { groups })
    }

    /// Version the server prefers for `group`, if the group is served at all
    #[must_use]
    pub fn preferred_version(&self, group: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .and_then(|g| g.preferred_version.as_deref())
    }

    #[must_use]
    pub fn groups(&self) -> &[DiscoveredGroup] {
        &self.groups
    }

    /// Every served group/version, paired with its resources
    pub fn resource_lists(&self) -> impl Iterator<Item = (String, &[DiscoveredResource])> {
        self.groups.iter().flat_map(|group| {
            group.versions.iter().map(move |version| {
                (
                    join_group_version(&group.name, &version.version),
                    version.resources.as_slice(),
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;

    fn api_resource(name: &str, kind: &str, namespaced: bool) -> APIResource {
        APIResource {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            singular_name: String::new(),
            verbs: vec!["get".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_join_core_group_has_no_prefix() {
        assert_eq!(join_group_version("", "v1"), "v1");
        assert_eq!(join_group_version("apps", "v1"), "apps/v1");
        assert_eq!(
            join_group_version("policy.open-cluster-management.io", "v1"),
            "policy.open-cluster-management.io/v1"
        );
    }

    #[test]
    fn test_subresources_are_skipped() {
        let list = APIResourceList {
            group_version: "v1".to_string(),
            resources: vec![
                api_resource("pods", "Pod", true),
                api_resource("pods/log", "Pod", true),
                api_resource("namespaces", "Namespace", false),
                api_resource("namespaces/status", "Namespace", false),
            ],
        };
        let version = DiscoveredVersion::from_resource_list("v1", list);
        assert_eq!(
            version.resources,
            vec![
                DiscoveredResource::namespaced("pods", "Pod"),
                DiscoveredResource::cluster_scoped("namespaces", "Namespace"),
            ]
        );
    }

    #[test]
    fn test_resource_lists_joins_group_versions() {
        let snapshot = DiscoverySnapshot::new(vec![
            DiscoveredGroup::new(
                "",
                vec![DiscoveredVersion::new(
                    "v1",
                    vec![DiscoveredResource::namespaced("secrets", "Secret")],
                )],
            ),
            DiscoveredGroup::new(
                "apps",
                vec![DiscoveredVersion::new(
                    "v1",
                    vec![DiscoveredResource::namespaced("deployments", "Deployment")],
                )],
            ),
        ]);
        let group_versions: Vec<String> = snapshot.resource_lists().map(|(gv, _)| gv).collect();
        assert_eq!(group_versions, vec!["v1".to_string(), "apps/v1".to_string()]);
    }

    #[test]
    fn test_preferred_version_per_group() {
        let snapshot = DiscoverySnapshot::new(vec![DiscoveredGroup {
            name: "policy.open-cluster-management.io".to_string(),
            preferred_version: Some("v1".to_string()),
            versions: vec![
                DiscoveredVersion::new("v1beta1", Vec::new()),
                DiscoveredVersion::new("v1", Vec::new()),
            ],
        }]);
        assert_eq!(
            snapshot.preferred_version("policy.open-cluster-management.io"),
            Some("v1")
        );
        assert_eq!(snapshot.preferred_version("apps"), None);
    }
}
