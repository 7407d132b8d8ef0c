use ingress_script_injector_k8s_api::{self as k8s, ConfigMap, Ingress, PostParams, ResourceExt};
use std::sync::Arc;

/// Reads and writes the resources a reconciliation depends on.
///
/// Getters return `Ok(None)` when the resource does not exist.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get_ingress(&self, namespace: &str, name: &str) -> k8s::Result<Option<Ingress>>;

    async fn get_config_map(&self, namespace: &str, name: &str)
        -> k8s::Result<Option<ConfigMap>>;

    /// Replaces the Ingress in full. The write is conditional on the
    /// `resourceVersion` carried by `ingress` and fails with a 409 if the
    /// Ingress has changed since it was read.
    async fn replace_ingress(&self, namespace: &str, ingress: &Ingress) -> k8s::Result<Ingress>;
}

/// A [`Store`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: k8s::Client,
    params: PostParams,
}

// === impl KubeStore ===

impl KubeStore {
    pub fn new(client: k8s::Client, field_manager: impl ToString) -> Self {
        Self {
            client,
            params: PostParams {
                field_manager: Some(field_manager.to_string()),
                ..Default::default()
            },
        }
    }
}

#[async_trait::async_trait]
impl Store for KubeStore {
    async fn get_ingress(&self, namespace: &str, name: &str) -> k8s::Result<Option<Ingress>> {
        k8s::Api::<Ingress>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> k8s::Result<Option<ConfigMap>> {
        k8s::Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn replace_ingress(&self, namespace: &str, ingress: &Ingress) -> k8s::Result<Ingress> {
        k8s::Api::<Ingress>::namespaced(self.client.clone(), namespace)
            .replace(&ingress.name_any(), &self.params, ingress)
            .await
    }
}

#[async_trait::async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    async fn get_ingress(&self, namespace: &str, name: &str) -> k8s::Result<Option<Ingress>> {
        (**self).get_ingress(namespace, name).await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> k8s::Result<Option<ConfigMap>> {
        (**self).get_config_map(namespace, name).await
    }

    async fn replace_ingress(&self, namespace: &str, ingress: &Ingress) -> k8s::Result<Ingress> {
        (**self).replace_ingress(namespace, ingress).await
    }
}
