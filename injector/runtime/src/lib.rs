#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use ingress_script_injector_core as core;
pub use ingress_script_injector_k8s_api as k8s;
pub use ingress_script_injector_k8s_reconcile as reconcile;

mod args;
mod controller;
mod references;

pub use self::args::Args;
