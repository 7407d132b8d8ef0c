use super::*;
use crate::{Error, Outcome};
use ingress_script_injector_core::snippet::INJECTED_ANNOTATION;
use pretty_assertions::assert_eq;
use tokio::time;

const HEAD_END: &str = "digitalist.cloud/add-script-head-end";
const HEAD_START: &str = "digitalist.cloud/add-script-head-start";
const BODY_START: &str = "digitalist.cloud/add-script-body-start";
const BODY_END: &str = "digitalist.cloud/add-script-body-end";

#[tokio::test]
async fn injects_head_end_script() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress("site", [(HEAD_END, "greeting-cm")]));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(
        store.snippet("site").as_deref(),
        Some("sub_filter '</head>' '<script>hi()</script></head>';\n")
    );
    assert_eq!(store.writes(), 1);
    assert_eq!(report.events(), vec![Reported::Updated(1)]);
}

#[tokio::test]
async fn missing_script_source_is_not_an_error() {
    let (reconciler, store, report) = reconciler();
    store.put_ingress(mk_ingress("site", [(HEAD_END, "greeting-cm")]));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.writes(), 0);
    assert_eq!(store.snippet("site"), None);
    assert_eq!(
        report.events(),
        vec![Reported::Unresolved(
            InjectionPoint::HeadEnd,
            ResolveError::SourceNotFound("greeting-cm".to_string())
        )]
    );
}

#[tokio::test]
async fn missing_script_key_is_not_an_error() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("js", HI)]));
    store.put_ingress(mk_ingress("site", [(BODY_END, "greeting-cm")]));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.writes(), 0);
    assert_eq!(
        report.events(),
        vec![Reported::Unresolved(
            InjectionPoint::BodyEnd,
            ResolveError::ScriptKeyMissing("greeting-cm".to_string())
        )]
    );
}

#[tokio::test]
async fn empty_source_name_is_not_fetched() {
    let (reconciler, store, report) = reconciler();
    store.put_ingress(mk_ingress("site", [(HEAD_START, " ")]));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.config_map_reads(), 0);
    assert_eq!(
        report.events(),
        vec![Reported::Unresolved(
            InjectionPoint::HeadStart,
            ResolveError::EmptyName
        )]
    );
}

#[tokio::test]
async fn deleted_ingress_is_not_an_error() {
    let (reconciler, store, _) = reconciler();
    let outcome = reconciler.reconcile(&id("gone")).await.unwrap();
    assert_eq!(outcome, Outcome::NotFound);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn ingress_without_annotations_is_untouched() {
    let (reconciler, store, report) = reconciler();
    store.put_ingress(mk_ingress("site", []));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Unchanged);
    assert_eq!(store.writes(), 0);
    assert_eq!(store.config_map_reads(), 0);
    assert!(report.events().is_empty());
}

#[tokio::test]
async fn second_reconcile_does_not_write() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [(HEAD_END, "greeting-cm"), (BODY_START, "greeting-cm")],
    ));

    assert_eq!(
        reconciler.reconcile(&id("site")).await.unwrap(),
        Outcome::Updated
    );
    let snippet = store.snippet("site");
    assert_eq!(
        reconciler.reconcile(&id("site")).await.unwrap(),
        Outcome::Unchanged
    );
    assert_eq!(store.writes(), 1);
    assert_eq!(store.snippet("site"), snippet);
}

#[tokio::test]
async fn existing_snippet_is_kept() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [
            (HEAD_END, "greeting-cm"),
            (SNIPPET_ANNOTATION, "more_set_headers \"X-Frame-Options: DENY\";"),
        ],
    ));

    reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(
        store.snippet("site").as_deref(),
        Some(
            "more_set_headers \"X-Frame-Options: DENY\";\n\
             sub_filter '</head>' '<script>hi()</script></head>';\n"
        )
    );

    // Re-running keeps the foreign content and does not duplicate ours.
    reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn directives_follow_injection_order() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("a", [("script", "<script>a()</script>")]));
    store.put_config_map(mk_config_map("b", [("script", "<script>b()</script>")]));
    store.put_config_map(mk_config_map("c", [("script", "<script>c()</script>")]));
    // Annotation keys sort as body-end, body-start, head-end.
    store.put_ingress(mk_ingress(
        "site",
        [(BODY_END, "c"), (BODY_START, "b"), (HEAD_END, "a")],
    ));

    reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(
        store.snippet("site").as_deref(),
        Some(
            "sub_filter '</head>' '<script>a()</script></head>';\n\
             sub_filter '<body>' '<body><script>b()</script>';\n\
             sub_filter '</body>' '<script>c()</script></body>';\n"
        )
    );
}

#[tokio::test]
async fn unresolved_point_does_not_block_others() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("tail", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [(HEAD_START, "missing"), (BODY_END, "tail")],
    ));

    let outcome = reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(
        store.snippet("site").as_deref(),
        Some("sub_filter '</body>' '<script>hi()</script></body>';\n")
    );
    assert_eq!(
        report.events(),
        vec![
            Reported::Unresolved(
                InjectionPoint::HeadStart,
                ResolveError::SourceNotFound("missing".to_string())
            ),
            Reported::Updated(1),
        ]
    );
}

#[tokio::test]
async fn removing_a_point_keeps_the_others() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("a", [("script", "<script>a()</script>")]));
    store.put_config_map(mk_config_map("b", [("script", "<script>b()</script>")]));
    store.put_ingress(mk_ingress("site", [(HEAD_END, "a"), (BODY_END, "b")]));
    reconciler.reconcile(&id("site")).await.unwrap();

    let mut ingress = store.ingress("site");
    ingress.annotations_mut().remove(HEAD_END);
    store.put_ingress(ingress);

    assert_eq!(
        reconciler.reconcile(&id("site")).await.unwrap(),
        Outcome::Updated
    );
    assert_eq!(
        store.snippet("site").as_deref(),
        Some("sub_filter '</body>' '<script>b()</script></body>';\n")
    );
}

#[tokio::test]
async fn changed_script_replaces_injected_directive() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [(HEAD_END, "greeting-cm"), (SNIPPET_ANNOTATION, "gzip off;")],
    ));
    reconciler.reconcile(&id("site")).await.unwrap();

    store.put_config_map(mk_config_map(
        "greeting-cm",
        [("script", "<script>bye()</script>")],
    ));
    assert_eq!(
        reconciler.reconcile(&id("site")).await.unwrap(),
        Outcome::Updated
    );

    let ingress = store.ingress("site");
    let annotations = ingress.annotations();
    assert_eq!(
        annotations.get(SNIPPET_ANNOTATION).map(String::as_str),
        Some("gzip off;\nsub_filter '</head>' '<script>bye()</script></head>';\n")
    );
    assert_eq!(
        annotations.get(INJECTED_ANNOTATION).map(String::as_str),
        Some("sub_filter '</head>' '<script>bye()</script></head>';\n")
    );
}

#[tokio::test]
async fn shared_source_is_fetched_once() {
    let (reconciler, store, _) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [
            (HEAD_END, "greeting-cm"),
            (HEAD_START, "greeting-cm"),
            (BODY_START, "greeting-cm"),
            (BODY_END, "greeting-cm"),
        ],
    ));

    reconciler.reconcile(&id("site")).await.unwrap();
    assert_eq!(store.config_map_reads(), 1);
    assert_eq!(store.snippet("site").unwrap().lines().count(), 4);
}

#[tokio::test]
async fn ingress_read_failure_is_retryable() {
    let (reconciler, store, _) = reconciler();
    store.put_ingress(mk_ingress("site", [(HEAD_END, "greeting-cm")]));
    store.fail_ingress_reads(500);

    let error = reconciler.reconcile(&id("site")).await.unwrap_err();
    assert!(matches!(error, Error::Kube(_)), "{error}");
    assert_eq!(error.kind(), "kube");
}

#[tokio::test(start_paused = true)]
async fn store_calls_time_out() {
    let (reconciler, store, _) = reconciler();
    store.hang();

    let error = reconciler.reconcile(&id("site")).await.unwrap_err();
    assert!(
        matches!(error, Error::Timeout { op: "get Ingress", .. }),
        "{error}"
    );
}

#[tokio::test]
async fn deleted_script_source_leaves_snippet_in_place() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress("site", [(HEAD_END, "greeting-cm")]));
    reconciler.reconcile(&id("site")).await.unwrap();
    let snippet = store.snippet("site");

    store.remove_config_map("greeting-cm");
    assert_eq!(
        reconciler.reconcile(&id("site")).await.unwrap(),
        Outcome::Unchanged
    );
    assert_eq!(store.writes(), 1);
    assert_eq!(store.snippet("site"), snippet);
    assert_eq!(
        report.events().last(),
        Some(&Reported::Unresolved(
            InjectionPoint::HeadEnd,
            ResolveError::SourceNotFound("greeting-cm".to_string())
        ))
    );
}

#[tokio::test]
async fn write_failure_is_retryable() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("greeting-cm", [("script", HI)]));
    store.put_ingress(mk_ingress("site", [(HEAD_END, "greeting-cm")]));
    store.fail_writes(500);

    let error = reconciler.reconcile(&id("site")).await.unwrap_err();
    assert!(matches!(error, Error::Kube(_)), "{error}");
    assert_eq!(store.writes(), 0);
    assert_eq!(store.snippet("site"), None);
    assert!(report.events().is_empty());
}

#[tokio::test]
async fn config_map_read_failure_fails_the_reconcile() {
    let (reconciler, store, report) = reconciler();
    store.put_config_map(mk_config_map("a", [("script", "<script>a()</script>")]));
    store.put_config_map(mk_config_map("b", [("script", "<script>b()</script>")]));
    store.put_ingress(mk_ingress("site", [(HEAD_END, "a"), (BODY_END, "b")]));
    store.fail_config_map_reads(503);

    let error = reconciler.reconcile(&id("site")).await.unwrap_err();
    assert!(matches!(error, Error::Kube(_)), "{error}");
    assert_eq!(store.writes(), 0);
    assert_eq!(store.snippet("site"), None);
    assert!(report.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_event_publishing_does_not_block_reconcile() {
    let (reconciler, store, report) = reconciler();
    report.hang();
    store.put_config_map(mk_config_map("tail", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [(HEAD_START, "missing"), (BODY_END, "tail")],
    ));

    let outcome = time::timeout(
        time::Duration::from_secs(60 * 60),
        reconciler.reconcile(&id("site")),
    )
    .await
    .expect("reconcile must not wait on event publishing")
    .unwrap();
    assert_eq!(outcome, Outcome::Updated);
    assert_eq!(store.writes(), 1);
    assert_eq!(
        report.events(),
        vec![
            Reported::Unresolved(
                InjectionPoint::HeadStart,
                ResolveError::SourceNotFound("missing".to_string())
            ),
            Reported::Updated(1),
        ]
    );
}

#[tokio::test]
async fn records_outcomes_and_resolution_failures() {
    let mut registry = Registry::default();
    let (reconciler, store, _) = reconciler_in(&mut registry);
    store.put_config_map(mk_config_map("tail", [("script", HI)]));
    store.put_ingress(mk_ingress(
        "site",
        [(HEAD_START, "missing"), (BODY_END, "tail")],
    ));

    reconciler.reconcile(&id("site")).await.unwrap();
    reconciler.reconcile(&id("site")).await.unwrap();

    let mut text = String::new();
    prometheus_client::encoding::text::encode(&mut text, &registry).unwrap();
    for line in [
        "reconciles_total{outcome=\"updated\"} 1",
        "reconciles_total{outcome=\"unchanged\"} 1",
        "resolution_failures_total{point=\"head-start\",reason=\"SourceNotFound\"} 2",
        "conflicts_total 0",
    ] {
        assert!(text.lines().any(|l| l == line), "missing {line:?} in\n{text}");
    }
}
