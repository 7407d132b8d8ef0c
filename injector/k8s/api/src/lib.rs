#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use k8s_openapi::api::{core::v1::ConfigMap, networking::v1::Ingress};
pub use kube::{
    api::{Api, ObjectMeta, PostParams, Resource, ResourceExt},
    core::ErrorResponse,
    runtime::{
        controller::Action,
        events::{Event, EventType, Recorder, Reporter},
        reflector::ObjectRef,
        watcher,
    },
    Client, Error, Result,
};

/// Returns true if a write was rejected because the resource changed since it
/// was read.
pub fn is_conflict(error: &Error) -> bool {
    matches!(error, Error::Api(ErrorResponse { code: 409, .. }))
}
