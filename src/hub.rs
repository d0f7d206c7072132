//! # Hub Config
//!
//! Derives a REST configuration for the hub cluster from a secret on the
//! managed cluster. The secret bundles a kubeconfig template whose user entry
//! points at certificate files (`client-certificate: tls.crt`,
//! `client-key: tls.key`) together with the `tls.crt` / `tls.key` material
//! itself. The file references are replaced by inline `*-data` fields so the
//! configuration is self-contained in memory.
//!
//! The derived configuration is cached for the lifetime of the process by
//! [`HubConfigCache`]; it is never refreshed, even if the secret rotates.

use crate::constants::{HUB_KUBECONFIG_KEY, HUB_TLS_CERT_KEY, HUB_TLS_KEY_KEY};
use crate::observability::metrics;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Api, Client, Config};
use serde_yaml::{Mapping, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum HubConfigError {
    #[error("hub config secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },
    #[error("error getting hub config secret {namespace}/{name}: {source}")]
    SecretFetch {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("hub config secret is missing key `{key}`")]
    MissingKey { key: &'static str },
    #[error("hub kubeconfig template is not valid UTF-8: {0}")]
    TemplateEncoding(#[from] std::str::Utf8Error),
    #[error("hub kubeconfig template is not valid YAML: {0}")]
    Template(#[from] serde_yaml::Error),
    #[error("error getting rest config for hub: {0}")]
    KubeconfigParse(#[from] KubeconfigError),
    #[error("failed to create hub client: {0}")]
    Client(#[source] kube::Error),
}

/// Inline the bundled certificate and key into a kubeconfig template
///
/// In every `users[].user` entry, `client-certificate: tls.crt` becomes
/// `client-certificate-data: <base64 cert>` and `client-key: tls.key` becomes
/// `client-key-data: <base64 key>`, keeping the entry's key order. References
/// to any other file and every other field are left as they are.
///
/// # Errors
///
/// [`HubConfigError::Template`] when the template is not YAML.
pub fn rewrite_kubeconfig(
    template: &str,
    cert: &[u8],
    key: &[u8],
) -> Result<Zeroizing<String>, HubConfigError> {
    let mut doc: Value = serde_yaml::from_str(template)?;
    let cert_data = Zeroizing::new(STANDARD.encode(cert));
    let key_data = Zeroizing::new(STANDARD.encode(key));

    let mut inlined = 0;
    if let Some(users) = doc.get_mut("users").and_then(Value::as_sequence_mut) {
        for entry in users {
            let Some(user) = entry.get_mut("user").and_then(Value::as_mapping_mut) else {
                continue;
            };
            inlined += inline_file_reference(
                user,
                "client-certificate",
                HUB_TLS_CERT_KEY,
                "client-certificate-data",
                &cert_data,
            );
            inlined += inline_file_reference(
                user,
                "client-key",
                HUB_TLS_KEY_KEY,
                "client-key-data",
                &key_data,
            );
        }
    }
    debug!("inlined {} certificate file references into hub kubeconfig", inlined);

    Ok(Zeroizing::new(serde_yaml::to_string(&doc)?))
}

/// Swap `file_field: file_name` for `data_field: data` at the same position
fn inline_file_reference(
    user: &mut Mapping,
    file_field: &str,
    file_name: &str,
    data_field: &str,
    data: &str,
) -> usize {
    let refers_to_bundle = user
        .get(file_field)
        .and_then(Value::as_str)
        .is_some_and(|f| f == file_name);
    if !refers_to_bundle {
        return 0;
    }

    *user = std::mem::take(user)
        .into_iter()
        .map(|(k, v)| {
            if k.as_str() == Some(file_field) {
                (
                    Value::String(data_field.to_string()),
                    Value::String(data.to_string()),
                )
            } else {
                (k, v)
            }
        })
        .collect();
    1
}

fn secret_field<'a>(secret: &'a Secret, key: &'static str) -> Result<&'a [u8], HubConfigError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|bytes| bytes.0.as_slice())
        .ok_or(HubConfigError::MissingKey { key })
}

/// Build the hub REST configuration from the bundle secret
///
/// # Errors
///
/// Fails when a bundle key is missing or the rewritten kubeconfig does not
/// yield a usable configuration.
pub async fn build_hub_config(secret: &Secret) -> Result<Config, HubConfigError> {
    let template = std::str::from_utf8(secret_field(secret, HUB_KUBECONFIG_KEY)?)?;
    let cert = secret_field(secret, HUB_TLS_CERT_KEY)?;
    let key = Zeroizing::new(secret_field(secret, HUB_TLS_KEY_KEY)?.to_vec());

    let kubeconfig_text = rewrite_kubeconfig(template, cert, &key)?;
    let kubeconfig = Kubeconfig::from_yaml(&kubeconfig_text)?;
    let config =
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(config)
}

/// Get the bundle secret from the managed cluster
///
/// # Errors
///
/// [`HubConfigError::SecretNotFound`] on 404, [`HubConfigError::SecretFetch`] otherwise.
pub async fn fetch_hub_secret(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Secret, HubConfigError> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    match secrets.get(name).await {
        Ok(secret) => Ok(secret),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            Err(HubConfigError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
        }
        Err(e) => Err(HubConfigError::SecretFetch {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source: e,
        }),
    }
}

/// Fetch the bundle secret and derive the hub configuration, uncached
///
/// # Errors
///
/// See [`fetch_hub_secret`] and [`build_hub_config`].
pub async fn load_hub_config(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Config, HubConfigError> {
    metrics::increment_hub_config_loads();
    let result = async {
        let secret = fetch_hub_secret(client, namespace, name).await?;
        build_hub_config(&secret).await
    }
    .await;

    match &result {
        Ok(config) => info!("loaded hub config for {}", config.cluster_url),
        Err(e) => {
            error!("error loading hub config from {}/{}: {}", namespace, name, e);
            metrics::increment_hub_config_load_errors();
        }
    }
    result
}

/// Process-lifetime slot for the hub configuration
///
/// Concurrent first requests are serialized: exactly one derives the
/// configuration, the others wait and share it. A failed derivation leaves the
/// slot empty so a later request tries again.
#[derive(Default)]
pub struct HubConfigCache {
    cell: OnceCell<Arc<Config>>,
}

impl std::fmt::Debug for HubConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfigCache")
            .field("loaded", &self.cell.initialized())
            .finish()
    }
}

impl HubConfigCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached configuration, deriving it on first use
    ///
    /// Once cached, `namespace` and `name` are ignored and the secret is not read again.
    ///
    /// # Errors
    ///
    /// See [`load_hub_config`].
    pub async fn get_or_load(
        &self,
        client: &Client,
        namespace: &str,
        name: &str,
    ) -> Result<Arc<Config>, HubConfigError> {
        self.cell
            .get_or_try_init(|| async {
                load_hub_config(client, namespace, name).await.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }
}
