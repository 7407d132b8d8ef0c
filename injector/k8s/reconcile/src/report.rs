use crate::ResolveError;
use ingress_script_injector_core::InjectionPoint;
use ingress_script_injector_k8s_api::{Event, EventType, Ingress, Recorder, Resource};
use std::sync::Arc;

/// Publishes reconciliation outcomes where cluster operators can see them.
#[async_trait::async_trait]
pub trait Report: Send + Sync {
    async fn unresolved(&self, ingress: &Ingress, point: InjectionPoint, error: &ResolveError);

    async fn updated(&self, ingress: &Ingress, directives: usize);
}

/// Publishes Kubernetes Events on the reconciled Ingress.
#[derive(Clone)]
pub struct KubeReport {
    recorder: Recorder,
}

// === impl KubeReport ===

impl KubeReport {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }

    async fn publish(&self, ingress: &Ingress, event: Event) {
        let reference = ingress.object_ref(&());
        if let Err(error) = self.recorder.publish(&event, &reference).await {
            tracing::warn!(%error, reason = %event.reason, "Failed to publish event");
        }
    }
}

#[async_trait::async_trait]
impl Report for KubeReport {
    async fn unresolved(&self, ingress: &Ingress, point: InjectionPoint, error: &ResolveError) {
        let event = Event {
            type_: EventType::Warning,
            reason: "ScriptSourceUnresolved".to_string(),
            note: Some(format!("{point}: {error}")),
            action: "Resolve".to_string(),
            secondary: None,
        };
        self.publish(ingress, event).await
    }

    async fn updated(&self, ingress: &Ingress, directives: usize) {
        let event = Event {
            type_: EventType::Normal,
            reason: "SnippetUpdated".to_string(),
            note: Some(format!(
                "Applied {directives} script directive(s) to the configuration snippet"
            )),
            action: "Update".to_string(),
            secondary: None,
        };
        self.publish(ingress, event).await
    }
}

#[async_trait::async_trait]
impl<R: Report + ?Sized> Report for Arc<R> {
    async fn unresolved(&self, ingress: &Ingress, point: InjectionPoint, error: &ResolveError) {
        (**self).unresolved(ingress, point, error).await
    }

    async fn updated(&self, ingress: &Ingress, directives: usize) {
        (**self).updated(ingress, directives).await
    }
}
