#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod injection_point;
pub mod snippet;

pub use self::{
    injection_point::{Directive, InjectionPoint},
    snippet::Merged,
};

/// The ConfigMap key holding script text.
pub const SCRIPT_KEY: &str = "script";

pub const INJECTOR_CONTROLLER_NAME: &str = "digitalist.cloud/ingress-script-injector";
