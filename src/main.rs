//! # Cert Policy Controller
//!
//! Process entry point. The reconcile loop, leader election and lease updates
//! are driven by the surrounding operator; this binary wires configuration,
//! logging, metrics, probes and the shared [`ControllerContext`].
//!
//! ## Subcommands
//!
//! - `run` (default) - start the controller core and serve probes until signalled
//! - `resolve --file <manifest>` - resolve one manifest against the cluster and print the live object

use anyhow::{Context, Result};
use cert_policy_controller::config::{
    operator_namespace, Cli, Command, ControllerConfig, ResolveArgs,
};
use cert_policy_controller::constants::{DEFAULT_LOG_FILTER, SERVICE_ACCOUNT_NAMESPACE_PATH};
use cert_policy_controller::observability::metrics;
use cert_policy_controller::server::{start_server, ServerState};
use cert_policy_controller::ControllerContext;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Must happen before any client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    info!(
        "cert-policy-controller {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    let config = kube::Config::infer()
        .await
        .context("Failed to load kubeconfig")?;
    let ctx = Arc::new(
        ControllerContext::from_config(config).context("Failed to create Kubernetes client")?,
    );

    match cli.command {
        Some(Command::Resolve(args)) => resolve(&ctx, &args).await,
        Some(Command::Run) | None => run(ctx, &cli.controller).await,
    }
}

async fn run(ctx: Arc<ControllerContext>, config: &ControllerConfig) -> Result<()> {
    let namespaces = config.watch_namespaces()?;
    if namespaces.is_empty() {
        info!("Watching all namespaces");
    } else {
        info!("Watching namespaces: {}", namespaces.join(", "));
    }
    info!("Managed cluster name: {}", config.cluster_name);

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let addr = config.health_probe_addr()?;
    let state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(addr, state).await {
            error!("HTTP server error: {}", e);
        }
    });

    if config.enable_lease {
        bootstrap_hub(&ctx, config).await?;
    } else {
        info!("Status lease disabled, not loading the hub kubeconfig");
    }

    server_state.mark_ready();
    info!("Cert policy controller started");

    shutdown_signal().await;
    info!("Controller stopped");

    Ok(())
}

/// Load the hub configuration ahead of the external lease controller
///
/// Only a failure to read the operator namespace is fatal.
async fn bootstrap_hub(ctx: &ControllerContext, config: &ControllerConfig) -> Result<()> {
    let operator_ns = operator_namespace(Path::new(SERVICE_ACCOUNT_NAMESPACE_PATH))
        .context("Failed to read the operator namespace")?;
    let Some(operator_ns) = operator_ns else {
        info!("Skipping lease; not running in a cluster.");
        return Ok(());
    };
    info!("Operator namespace: {}", operator_ns);

    if ctx
        .bootstrap_hub(&config.hubconfig_secret_ns, &config.hubconfig_secret_name)
        .await
        .is_some()
    {
        info!("Starting lease controller to report status");
    }
    Ok(())
}

async fn resolve(ctx: &ControllerContext, args: &ResolveArgs) -> Result<()> {
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    match ctx.resolver().get_generic_object(&data, &args.namespace).await {
        Ok(Some(object)) => {
            let yaml = serde_yaml::to_string(&object).context("Failed to render object")?;
            println!("{yaml}");
            Ok(())
        }
        Ok(None) => {
            println!("object does not exist on the cluster");
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            println!("{e}");
            Ok(())
        }
        Err(e) if e.is_fatal() => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
