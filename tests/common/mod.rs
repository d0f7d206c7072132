//! Common utilities for integration tests
//!
//! Provides an in-process fake Kubernetes API server. Responses are fixtures
//! keyed by request path; every request is counted per path so tests can
//! assert how often the controller went to the API.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use axum::{extract::State, http::StatusCode, http::Uri, Json, Router};
use kube::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const POLICY_GROUP: &str = "policy.open-cluster-management.io";

#[derive(Default)]
struct FakeState {
    routes: HashMap<String, (StatusCode, Value)>,
    hits: Mutex<HashMap<String, usize>>,
}

/// Route table for [`FakeApiServer`]
#[derive(Default)]
pub struct Routes {
    routes: HashMap<String, (StatusCode, Value)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovery for the core group (Secret, Namespace) and the policy group
    pub fn with_discovery() -> Self {
        Self::new()
            .ok(
                "/api",
                json!({
                    "kind": "APIVersions",
                    "versions": ["v1"],
                    "serverAddressByClientCIDRs": []
                }),
            )
            .ok(
                "/api/v1",
                resource_list(
                    "v1",
                    &[
                        ("secrets", "secret", "Secret", true),
                        ("namespaces", "namespace", "Namespace", false),
                        ("namespaces/status", "", "Namespace", false),
                    ],
                ),
            )
            .ok(
                "/apis",
                json!({
                    "kind": "APIGroupList",
                    "apiVersion": "v1",
                    "groups": [{
                        "name": POLICY_GROUP,
                        "versions": [{
                            "groupVersion": format!("{POLICY_GROUP}/v1"),
                            "version": "v1"
                        }],
                        "preferredVersion": {
                            "groupVersion": format!("{POLICY_GROUP}/v1"),
                            "version": "v1"
                        }
                    }]
                }),
            )
            .ok(
                &format!("/apis/{POLICY_GROUP}/v1"),
                resource_list(
                    &format!("{POLICY_GROUP}/v1"),
                    &[
                        ("certificatepolicies", "certificatepolicy", "CertificatePolicy", true),
                        ("policyreports", "policyreport", "PolicyReport", false),
                    ],
                ),
            )
    }

    pub fn ok(self, path: &str, body: Value) -> Self {
        self.respond(path, StatusCode::OK, body)
    }

    /// Answer `path` with a `Status` failure
    pub fn fail(self, path: &str, code: StatusCode) -> Self {
        let body = status_body(code, &format!("fixture failure for {path}"));
        self.respond(path, code, body)
    }

    pub fn respond(mut self, path: &str, code: StatusCode, body: Value) -> Self {
        self.routes.insert(path.to_string(), (code, body));
        self
    }
}

/// A running fake API server; stops when dropped
pub struct FakeApiServer {
    addr: SocketAddr,
    state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeApiServer {
    pub async fn start(routes: Routes) -> Self {
        let state = Arc::new(FakeState {
            routes: routes.routes,
            hits: Mutex::new(HashMap::new()),
        });

        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn config(&self) -> kube::Config {
        init_rustls();
        let url = format!("http://{}", self.addr).parse().unwrap();
        let mut config = kube::Config::new(url);
        config.default_namespace = "default".to_string();
        config
    }

    pub fn client(&self) -> Client {
        Client::try_from(self.config()).unwrap()
    }

    /// Number of requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for FakeApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(State(state): State<Arc<FakeState>>, uri: Uri) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    *state.hits.lock().unwrap().entry(path.clone()).or_default() += 1;

    match state.routes.get(&path) {
        Some((code, body)) => (*code, Json(body.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(status_body(StatusCode::NOT_FOUND, &format!("{path} not found"))),
        ),
    }
}

fn status_body(code: StatusCode, message: &str) -> Value {
    let reason = match code {
        StatusCode::NOT_FOUND => "NotFound",
        StatusCode::FORBIDDEN => "Forbidden",
        _ => "InternalError",
    };
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code.as_u16()
    })
}

/// `APIResourceList` body; entries are (name, singularName, kind, namespaced)
pub fn resource_list(group_version: &str, resources: &[(&str, &str, &str, bool)]) -> Value {
    let resources: Vec<Value> = resources
        .iter()
        .map(|(name, singular, kind, namespaced)| {
            json!({
                "name": name,
                "singularName": singular,
                "namespaced": namespaced,
                "kind": kind,
                "verbs": ["get", "list", "watch"]
            })
        })
        .collect();
    json!({
        "kind": "APIResourceList",
        "apiVersion": "v1",
        "groupVersion": group_version,
        "resources": resources
    })
}

pub fn certificate_policy(namespace: &str, name: &str) -> Value {
    json!({
        "apiVersion": format!("{POLICY_GROUP}/v1"),
        "kind": "CertificatePolicy",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "42"
        },
        "spec": {
            "minimumDuration": "100h",
            "namespaceSelector": { "include": ["default"] },
            "severity": "low"
        }
    })
}

pub fn policy_report(name: &str) -> Value {
    json!({
        "apiVersion": format!("{POLICY_GROUP}/v1"),
        "kind": "PolicyReport",
        "metadata": { "name": name, "resourceVersion": "7" },
        "results": []
    })
}
