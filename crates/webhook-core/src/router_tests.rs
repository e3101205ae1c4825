use super::*;
use crate::metrics::RecordingMetrics;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

struct RecordingHandler {
    label: &'static str,
    order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    fails: bool,
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, _context: &HandlerContext) -> Result<(), RouterError> {
        self.order.lock().unwrap().push(self.label);
        if self.fails {
            Err(RouterError::HandlerFailed {
                handler: self.label.to_string(),
                message: "boom".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn context(event: &str, action: Option<&str>) -> HandlerContext {
    HandlerContext::new(
        "d-1",
        event,
        action.map(str::to_string),
        json!({}),
        None,
        None,
        false,
    )
}

#[test]
fn event_pattern_star_matches_anything() {
    assert!(event_matches("*", "issues"));
    assert!(event_matches("*", "pull_request"));
}

#[test]
fn event_pattern_prefix_star_matches_only_exact_event() {
    assert!(event_matches("issues.*", "issues"));
    assert!(!event_matches("issues.*", "issues_comment"));
}

#[test]
fn event_pattern_exact_is_case_insensitive() {
    assert!(event_matches("Issues", "issues"));
    assert!(!event_matches("issues", "pull_request"));
}

#[test]
fn action_pattern_null_matches_any_action_including_null() {
    assert!(action_matches(None, Some("opened")));
    assert!(action_matches(None, None));
    assert!(action_matches(Some("*"), Some("closed")));
}

#[test]
fn specific_action_pattern_does_not_match_null_action() {
    assert!(!action_matches(Some("opened"), None));
    assert!(action_matches(Some("opened"), Some("opened")));
    assert!(!action_matches(Some("opened"), Some("closed")));
}

#[tokio::test]
async fn dispatch_runs_handlers_in_registration_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    for label in ["h1", "h2", "h3"] {
        let order = Arc::clone(&order);
        router.register("handler", "issues", None, move || {
            Arc::new(RecordingHandler {
                label,
                order: Arc::clone(&order),
                fails: false,
            }) as Arc<dyn Handler>
        });
    }

    let metrics = RecordingMetrics::new();
    router.dispatch(&context("issues", Some("opened")), &metrics).await;

    assert_eq!(*order.lock().unwrap(), vec!["h1", "h2", "h3"]);
}

#[tokio::test]
async fn one_handler_failing_does_not_prevent_the_rest_from_running() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut router = EventRouter::new();
    let order1 = Arc::clone(&order);
    router.register("failing", "issues", None, move || {
        Arc::new(RecordingHandler {
            label: "failing",
            order: Arc::clone(&order1),
            fails: true,
        }) as Arc<dyn Handler>
    });
    let order2 = Arc::clone(&order);
    router.register("ok", "issues", None, move || {
        Arc::new(RecordingHandler {
            label: "ok",
            order: Arc::clone(&order2),
            fails: false,
        }) as Arc<dyn Handler>
    });

    let metrics = RecordingMetrics::new();
    router.dispatch(&context("issues", Some("opened")), &metrics).await;

    assert_eq!(*order.lock().unwrap(), vec!["failing", "ok"]);
    assert_eq!(metrics.counter_total("webhook.routing_error"), 1);
}

#[tokio::test]
async fn non_matching_event_is_skipped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = EventRouter::new();
    let calls2 = Arc::clone(&calls);
    router.register("pr-only", "pull_request", None, move || {
        let calls = Arc::clone(&calls2);
        Arc::new(CountingHandler { calls }) as Arc<dyn Handler>
    });

    let metrics = RecordingMetrics::new();
    router.dispatch(&context("issues", Some("opened")), &metrics).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle(&self, _context: &HandlerContext) -> Result<(), RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn context_accessors_extract_known_payload_shapes() {
    let context = HandlerContext::new(
        "d-1",
        "issues",
        Some("opened".to_string()),
        json!({
            "repository": {"full_name": "acme/widgets", "id": 99},
            "issue": {"number": 42, "title": "it broke"},
        }),
        None,
        None,
        false,
    );

    let repo = context.repo().unwrap();
    assert_eq!(repo.owner, "acme");
    assert_eq!(repo.name, "widgets");
    assert_eq!(repo.id, 99);

    let issue = context.issue().unwrap();
    assert_eq!(issue.number, 42);

    assert!(context.pull_request().is_err());
}

#[tokio::test]
async fn dry_run_execute_skips_the_side_effect() {
    let context = HandlerContext::new("d-1", "issues", None, json!({}), None, None, true);
    let executed = Arc::new(AtomicUsize::new(0));
    let executed2 = Arc::clone(&executed);

    let result = context
        .dry_run_execute("close issue", &json!({"number": 1}), "skipped", move || {
            let executed = Arc::clone(&executed2);
            async move {
                executed.fetch_add(1, Ordering::SeqCst);
                "executed"
            }
        })
        .await;

    assert_eq!(result, "skipped");
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}
