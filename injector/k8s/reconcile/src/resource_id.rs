use ingress_script_injector_k8s_api::{Ingress, ResourceExt};
use std::fmt;

/// Identifies an Ingress under reconciliation. ConfigMap lookups are scoped to
/// the same namespace.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl ToString, name: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Returns `None` if the Ingress has no namespace.
    pub fn from_ingress(ingress: &Ingress) -> Option<Self> {
        let namespace = ingress.namespace()?;
        Some(Self {
            namespace,
            name: ingress.name_any(),
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
