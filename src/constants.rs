//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration flags or environment variables where applicable.

/// Default bind address for the health probe / metrics server
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = ":8081";

/// Default namespace holding the hub kubeconfig secret
pub const DEFAULT_HUBCONFIG_SECRET_NAMESPACE: &str = "open-cluster-management-agent-addon";

/// Default name of the hub kubeconfig secret
pub const DEFAULT_HUBCONFIG_SECRET_NAME: &str = "cert-policy-controller-hub-kubeconfig";

/// Default managed cluster name reported to the hub
pub const DEFAULT_CLUSTER_NAME: &str = "default-cluster";

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "cert_policy_controller=info";

/// Secret key holding the templated hub kubeconfig
pub const HUB_KUBECONFIG_KEY: &str = "kubeconfig";

/// Secret key holding the client certificate (also the file name the template refers to)
pub const HUB_TLS_CERT_KEY: &str = "tls.crt";

/// Secret key holding the client private key (also the file name the template refers to)
pub const HUB_TLS_KEY_KEY: &str = "tls.key";

/// File mounted into every pod with its service account namespace
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
