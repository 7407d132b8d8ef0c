use ingress_script_injector_k8s_api as k8s;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that fail a reconciliation. The controller requeues the Ingress and
/// runs the whole reconciliation again, except for `MissingNamespace`, which
/// waits for the object to change.
#[derive(Debug, Error)]
pub enum Error {
    #[error("kubernetes API request failed: {0}")]
    Kube(#[from] k8s::Error),

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("Ingress was modified concurrently on {attempts} attempts")]
    Conflict { attempts: usize },

    #[error("Ingress has no namespace")]
    MissingNamespace,
}

/// A script source that could not be resolved. These only skip the affected
/// injection point; they never fail the reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("script source name is empty")]
    EmptyName,

    #[error("ConfigMap {0} not found")]
    SourceNotFound(String),

    #[error("ConfigMap {0} does not contain 'script' key")]
    ScriptKeyMissing(String),
}

// === impl Error ===

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Kube(_) => "kube",
            Self::Timeout { .. } => "timeout",
            Self::Conflict { .. } => "conflict",
            Self::MissingNamespace => "missing_namespace",
        }
    }
}

// === impl ResolveError ===

impl ResolveError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyName => "EmptyName",
            Self::SourceNotFound(_) => "SourceNotFound",
            Self::ScriptKeyMissing(_) => "ScriptKeyMissing",
        }
    }
}
