//! # Generic Fetcher
//!
//! Reads one live object through a dynamic client bound to the mapped
//! group/version. Absence is reported differently per scope:
//!
//! - cluster-scoped: a missing object is `Ok(None)`
//! - namespaced: a missing object is [`ResolveError::NotFound`]

use super::manifest::GenericObject;
use super::mapper::ResourceMapping;
use super::scope::Scope;
use super::ResolveError;
use kube::api::{Api, DynamicObject};
use kube::Client;
use tracing::{debug, error};

/// Get `name` from the API server in the given scope
///
/// `namespace` is ignored for cluster-scoped resources.
///
/// # Errors
///
/// [`ResolveError::NotFound`] for a missing namespaced object,
/// [`ResolveError::Fetch`] for any other API failure.
pub async fn fetch_object(
    client: &Client,
    mapping: &ResourceMapping,
    scope: Scope,
    namespace: &str,
    name: &str,
) -> Result<Option<GenericObject>, ResolveError> {
    let api_resource = mapping.api_resource();

    match scope {
        Scope::Cluster => {
            let api: Api<DynamicObject> = Api::all_with(client.clone(), &api_resource);
            match api.get(name).await {
                Ok(object) => {
                    debug!("object `{}` retrieved from the api server", name);
                    Ok(Some(GenericObject::try_from(object)?))
                }
                Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                    debug!(
                        "cluster-scoped {} `{}` does not exist: {}",
                        mapping.resource, name, api_err.message
                    );
                    Ok(None)
                }
                Err(e) => {
                    error!("object `{}` cannot be retrieved from the api server", name);
                    Err(ResolveError::Fetch {
                        resource: mapping.resource.clone(),
                        name: name.to_string(),
                        source: e,
                    })
                }
            }
        }
        Scope::Namespaced => {
            let api: Api<DynamicObject> =
                Api::namespaced_with(client.clone(), namespace, &api_resource);
            match api.get(name).await {
                Ok(object) => {
                    debug!(
                        "object `{}` retrieved from namespace {}",
                        name, namespace
                    );
                    Ok(Some(GenericObject::try_from(object)?))
                }
                Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                    debug!(
                        "namespaced {} `{}` not found in {}: {}",
                        mapping.resource, name, namespace, api_err.message
                    );
                    Err(ResolveError::NotFound {
                        resource: mapping.resource.clone(),
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                    })
                }
                Err(e) => {
                    error!(
                        "object `{}` cannot be retrieved from namespace {}",
                        name, namespace
                    );
                    Err(ResolveError::Fetch {
                        resource: mapping.resource.clone(),
                        name: name.to_string(),
                        source: e,
                    })
                }
            }
        }
    }
}
