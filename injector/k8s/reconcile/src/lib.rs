#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
mod metrics;
mod reconciler;
mod report;
mod resource_id;
mod store;


pub use self::{
    error::{Error, ResolveError, Result},
    metrics::ReconcileMetrics,
    reconciler::{Outcome, Params, Reconciler},
    report::{KubeReport, Report},
    resource_id::ResourceId,
    store::{KubeStore, Store},
};
