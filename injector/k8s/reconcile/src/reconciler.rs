use crate::{Error, ReconcileMetrics, Report, ResolveError, ResourceId, Result, Store};
use ingress_script_injector_core::{
    snippet::{INJECTED_ANNOTATION, SNIPPET_ANNOTATION},
    Directive, InjectionPoint, Merged, SCRIPT_KEY,
};
use ingress_script_injector_k8s_api::{self as k8s, Ingress, ResourceExt};
use std::{collections::HashMap, future::Future};
use tokio::time;
use tracing::{debug, info, warn};

/// Injects script sources into the configuration snippet of a single Ingress.
///
/// The reconciler holds no state between invocations; every call re-reads the
/// Ingress and its script sources from the store.
pub struct Reconciler<S, R> {
    store: S,
    report: R,
    metrics: ReconcileMetrics,
    params: Params,
}

#[derive(Clone, Debug)]
pub struct Params {
    /// Bounds every individual store call.
    pub store_timeout: time::Duration,

    /// How many times a reconciliation is re-run after its write is rejected
    /// by a concurrent modification.
    pub max_conflict_retries: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The Ingress no longer exists.
    NotFound,
    /// The Ingress already holds the desired snippet, or there is nothing to
    /// inject.
    Unchanged,
    /// The Ingress was written with a new snippet.
    Updated,
}

enum Attempt {
    Done(Outcome),
    Conflict,
}

type Scripts = HashMap<String, Result<String, ResolveError>>;

/// Resolution failures already reported during this reconciliation.
type Reported = Vec<(InjectionPoint, ResolveError)>;

// === impl Params ===

impl Default for Params {
    fn default() -> Self {
        Self {
            store_timeout: time::Duration::from_secs(5),
            max_conflict_retries: 3,
        }
    }
}

// === impl Outcome ===

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
        }
    }
}

// === impl Reconciler ===

impl<S: Store, R: Report> Reconciler<S, R> {
    pub fn new(store: S, report: R, metrics: ReconcileMetrics, params: Params) -> Self {
        Self {
            store,
            report,
            metrics,
            params,
        }
    }

    pub fn metrics(&self) -> &ReconcileMetrics {
        &self.metrics
    }

    /// Reconciles the Ingress identified by `id`.
    ///
    /// A write rejected by a concurrent modification restarts the whole
    /// reconciliation from a fresh read. Each resolution failure is reported
    /// once, however many attempts observe it.
    pub async fn reconcile(&self, id: &ResourceId) -> Result<Outcome> {
        let mut reported = Reported::new();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(id, &mut reported).await? {
                Attempt::Done(outcome) => {
                    self.metrics.outcome(outcome);
                    return Ok(outcome);
                }
                Attempt::Conflict => {
                    self.metrics.conflict();
                    if attempts > self.params.max_conflict_retries {
                        return Err(Error::Conflict { attempts });
                    }
                    debug!(%attempts, "Ingress changed concurrently; retrying");
                }
            }
        }
    }

    async fn attempt(&self, id: &ResourceId, reported: &mut Reported) -> Result<Attempt> {
        let ingress = match self
            .timed("get Ingress", self.store.get_ingress(&id.namespace, &id.name))
            .await?
        {
            Some(ingress) => ingress,
            None => {
                debug!("Ingress not found");
                return Ok(Attempt::Done(Outcome::NotFound));
            }
        };

        let directives = self.resolve(&id.namespace, &ingress, reported).await?;
        if directives.is_empty() {
            return Ok(Attempt::Done(Outcome::Unchanged));
        }

        let annotations = ingress.annotations();
        let snippet = annotations.get(SNIPPET_ANNOTATION).map(String::as_str);
        let previous = annotations.get(INJECTED_ANNOTATION).map(String::as_str);
        let merged = Merged::new(snippet, previous, &directives);
        if merged.is_current(snippet, previous) {
            debug!("Configuration snippet is up to date");
            return Ok(Attempt::Done(Outcome::Unchanged));
        }

        let mut ingress = ingress;
        let Merged { snippet, injected } = merged;
        let annotations = ingress.annotations_mut();
        annotations.insert(SNIPPET_ANNOTATION.to_string(), snippet);
        if injected.is_empty() {
            annotations.remove(INJECTED_ANNOTATION);
        } else {
            annotations.insert(INJECTED_ANNOTATION.to_string(), injected);
        }

        match self
            .timed(
                "replace Ingress",
                self.store.replace_ingress(&id.namespace, &ingress),
            )
            .await
        {
            Ok(updated) => {
                info!(directives = directives.len(), "Updated configuration snippet");
                self.notify("SnippetUpdated", self.report.updated(&updated, directives.len()))
                    .await;
                Ok(Attempt::Done(Outcome::Updated))
            }
            Err(Error::Kube(error)) if k8s::is_conflict(&error) => Ok(Attempt::Conflict),
            Err(error) => Err(error),
        }
    }

    /// Formats a directive for every injection point whose script source
    /// resolves, in [`InjectionPoint::ALL`] order. Unresolvable sources are
    /// reported and skipped.
    async fn resolve(
        &self,
        namespace: &str,
        ingress: &Ingress,
        reported: &mut Reported,
    ) -> Result<Vec<Directive>> {
        let annotations = ingress.annotations();
        let mut scripts = Scripts::new();
        let mut directives = Vec::with_capacity(InjectionPoint::ALL.len());

        for point in InjectionPoint::ALL {
            let Some(source) = annotations.get(point.annotation()) else {
                continue;
            };
            let source = source.trim();

            match self.script(&mut scripts, namespace, source).await? {
                Ok(script) => directives.push(point.directive(script)),
                Err(error) => {
                    let failure = (point, error.clone());
                    if reported.contains(&failure) {
                        continue;
                    }
                    warn!(%point, configmap = %source, %error, "Failed to resolve script source");
                    self.metrics.resolution_failure(point, error);
                    self.notify(
                        "ScriptSourceUnresolved",
                        self.report.unresolved(ingress, point, error),
                    )
                    .await;
                    reported.push(failure);
                }
            }
        }

        Ok(directives)
    }

    /// Looks up the script held by the named ConfigMap. Each ConfigMap is
    /// fetched at most once per reconciliation.
    async fn script<'s>(
        &self,
        scripts: &'s mut Scripts,
        namespace: &str,
        name: &str,
    ) -> Result<&'s Result<String, ResolveError>> {
        if !scripts.contains_key(name) {
            let script = if name.is_empty() {
                Err(ResolveError::EmptyName)
            } else {
                match self
                    .timed("get ConfigMap", self.store.get_config_map(namespace, name))
                    .await?
                {
                    None => Err(ResolveError::SourceNotFound(name.to_string())),
                    Some(cm) => cm
                        .data
                        .and_then(|mut data| data.remove(SCRIPT_KEY))
                        .ok_or_else(|| ResolveError::ScriptKeyMissing(name.to_string())),
                }
            };
            scripts.insert(name.to_string(), script);
        }

        Ok(&scripts[name])
    }

    /// Reports are best-effort; one that outlives the store timeout is
    /// abandoned.
    async fn notify(&self, reason: &'static str, publish: impl Future<Output = ()>) {
        let timeout = self.params.store_timeout;
        if time::timeout(timeout, publish).await.is_err() {
            warn!(%reason, ?timeout, "Timed out reporting event");
        }
    }

    async fn timed<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = k8s::Result<T>>,
    ) -> Result<T> {
        let timeout = self.params.store_timeout;
        match time::timeout(timeout, call).await {
            Ok(res) => res.map_err(Into::into),
            Err(_) => Err(Error::Timeout { op, timeout }),
        }
    }
}
