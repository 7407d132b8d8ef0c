use crate::{
    controller::{self, Context},
    core::INJECTOR_CONTROLLER_NAME,
    k8s::{Recorder, Reporter},
    reconcile::{KubeReport, KubeStore, Params, ReconcileMetrics, Reconciler},
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-script-injector",
    about = "Injects ConfigMap scripts into Ingress configuration snippets"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_script_injector=info,warn",
        env = "INGRESS_SCRIPT_INJECTOR_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Only watch Ingresses and ConfigMaps in this namespace.
    #[clap(long)]
    namespace: Option<String>,

    /// Bounds each read or write against the Kubernetes API.
    #[clap(long, default_value = "5000")]
    store_timeout_ms: u64,

    /// Re-runs of a reconciliation after its write hits a conflict.
    #[clap(long, default_value = "3")]
    max_conflict_retries: usize,

    #[clap(long, default_value = "30")]
    error_requeue_secs: u64,

    #[clap(long, default_value = "ingress-script-injector")]
    field_manager: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            namespace,
            store_timeout_ms,
            max_conflict_retries,
            error_requeue_secs,
            field_manager,
        } = self;

        let mut prom = <Registry>::default();
        let metrics =
            ReconcileMetrics::register(prom.sub_registry_with_prefix("ingress_script_injector"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let client = runtime.client();
        let reporter = Reporter {
            controller: INJECTOR_CONTROLLER_NAME.to_string(),
            instance: std::env::var("HOSTNAME").ok(),
        };
        let reconciler = Reconciler::new(
            KubeStore::new(client.clone(), field_manager),
            KubeReport::new(Recorder::new(client.clone(), reporter)),
            metrics,
            Params {
                store_timeout: Duration::from_millis(store_timeout_ms),
                max_conflict_retries,
            },
        );
        let ctx = Arc::new(Context {
            reconciler,
            error_requeue: Duration::from_secs(error_requeue_secs),
        });

        match namespace.as_deref() {
            Some(ns) => info!(namespace = %ns, "Watching Ingresses"),
            None => info!("Watching Ingresses in all namespaces"),
        }
        tokio::spawn(
            controller::run(client, namespace, ctx, runtime.shutdown_handle())
                .instrument(info_span!("ingresses")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
