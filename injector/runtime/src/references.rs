use crate::{
    core::InjectionPoint,
    k8s::{ConfigMap, Ingress, ObjectRef, ResourceExt},
};

/// Returns the Ingresses that name `cm` as a script source at any injection
/// point, so that a ConfigMap change re-triggers their reconciliation.
pub(crate) fn referencing<'i>(
    ingresses: impl IntoIterator<Item = &'i Ingress>,
    cm: &ConfigMap,
) -> Vec<ObjectRef<Ingress>> {
    let Some(namespace) = cm.namespace() else {
        return vec![];
    };
    let name = cm.name_any();

    ingresses
        .into_iter()
        .filter(|ingress| ingress.namespace().as_deref() == Some(namespace.as_str()))
        .filter(|ingress| references(ingress, &name))
        .map(ObjectRef::from_obj)
        .collect()
}

fn references(ingress: &Ingress, name: &str) -> bool {
    let annotations = ingress.annotations();
    InjectionPoint::ALL.into_iter().any(|point| {
        annotations
            .get(point.annotation())
            .is_some_and(|source| source.trim() == name)
    })
}
