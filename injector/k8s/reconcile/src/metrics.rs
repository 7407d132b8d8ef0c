use crate::{Error, Outcome, ResolveError};
use ingress_script_injector_core::InjectionPoint;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug)]
pub struct ReconcileMetrics {
    reconciles: Family<OutcomeLabels, Counter>,
    resolution_failures: Family<ResolutionLabels, Counter>,
    conflicts: Counter,
    errors: Family<ErrorLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ResolutionLabels {
    point: &'static str,
    reason: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ErrorLabels {
    kind: &'static str,
}

// === impl ReconcileMetrics ===

impl ReconcileMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let reconciles = Family::default();
        reg.register(
            "reconciles",
            "Count of Ingress reconciliations by outcome",
            reconciles.clone(),
        );

        let resolution_failures = Family::default();
        reg.register(
            "resolution_failures",
            "Count of script sources that could not be resolved",
            resolution_failures.clone(),
        );

        let conflicts = Counter::default();
        reg.register(
            "conflicts",
            "Count of Ingress writes rejected by a concurrent modification",
            conflicts.clone(),
        );

        let errors = Family::default();
        reg.register(
            "errors",
            "Count of failed reconciliations by error kind",
            errors.clone(),
        );

        Self {
            reconciles,
            resolution_failures,
            conflicts,
            errors,
        }
    }

    pub(crate) fn outcome(&self, outcome: Outcome) {
        self.reconciles
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str(),
            })
            .inc();
    }

    pub(crate) fn resolution_failure(&self, point: InjectionPoint, error: &ResolveError) {
        self.resolution_failures
            .get_or_create(&ResolutionLabels {
                point: point.as_str(),
                reason: error.reason(),
            })
            .inc();
    }

    pub(crate) fn conflict(&self) {
        self.conflicts.inc();
    }

    pub fn error(&self, error: &Error) {
        self.errors
            .get_or_create(&ErrorLabels { kind: error.kind() })
            .inc();
    }
}
