use crate::{
    k8s::{self, watcher, Action, ConfigMap, Ingress, ResourceExt},
    reconcile::{self, KubeReport, KubeStore, Reconciler, ResourceId},
    references::referencing,
};
use futures::prelude::*;
use kube::runtime::Controller;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, info_span, Instrument};

pub(crate) struct Context {
    pub(crate) reconciler: Reconciler<KubeStore, KubeReport>,
    pub(crate) error_requeue: Duration,
}

/// Runs the Ingress controller until the shutdown signal fires.
pub(crate) async fn run(
    client: k8s::Client,
    namespace: Option<String>,
    ctx: Arc<Context>,
    drain: drain::Watch,
) {
    let (ingresses, config_maps) = match namespace.as_deref() {
        Some(ns) => (
            k8s::Api::<Ingress>::namespaced(client.clone(), ns),
            k8s::Api::<ConfigMap>::namespaced(client, ns),
        ),
        None => (
            k8s::Api::<Ingress>::all(client.clone()),
            k8s::Api::<ConfigMap>::all(client),
        ),
    };

    let controller = Controller::new(ingresses, watcher::Config::default());
    let index = controller.store();

    let (close_tx, close_rx) = tokio::sync::oneshot::channel::<()>();
    let ctrl = controller
        .watches(config_maps, watcher::Config::default(), move |cm| {
            let ingresses = index.state();
            referencing(ingresses.iter().map(|i| &**i), &cm)
        })
        .graceful_shutdown_on(close_rx.map(|_| ()))
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!(namespace = ?obj.namespace, name = %obj.name, "Reconciled"),
                Err(error) => debug!(%error, "Reconcile failed"),
            }
        });
    tokio::pin!(ctrl);

    info!("Ingress controller running");
    tokio::select! {
        _ = (&mut ctrl) => {}
        handle = drain.signaled() => {
            let _ = close_tx.send(());
            handle.release_after(ctrl).await;
        }
    }
}

async fn reconcile(ingress: Arc<Ingress>, ctx: Arc<Context>) -> reconcile::Result<Action> {
    let id = ResourceId::from_ingress(&ingress).ok_or(reconcile::Error::MissingNamespace)?;
    let span = info_span!("reconcile", namespace = %id.namespace, name = %id.name);
    ctx.reconciler.reconcile(&id).instrument(span).await?;
    Ok(Action::await_change())
}

fn error_policy(ingress: Arc<Ingress>, error: &reconcile::Error, ctx: Arc<Context>) -> Action {
    tracing::error!(
        namespace = ?ingress.namespace(),
        name = %ingress.name_any(),
        %error,
        "Failed to reconcile Ingress"
    );
    ctx.reconciler.metrics().error(error);
    retry(error, ctx.error_requeue)
}

fn retry(error: &reconcile::Error, requeue: Duration) -> Action {
    match error {
        // Only a new version of the object can carry a namespace.
        reconcile::Error::MissingNamespace => Action::await_change(),
        _ => Action::requeue(requeue),
    }
}
