//! Attach maneuver and live-stream lifecycle acceptance tests.

use crate::config::ViewerConfig;
use crate::model::{JobState, StatusEvent, ViewerError};
use crate::orchestrator::Orchestrator;
use crate::test_harness::*;

#[tokio::test]
async fn cold_attach_to_a_running_job() {
    let mut fx = fixture(FixtureSpec {
        events: vec![span_event(1, 1, 50)],
        state: JobState::Running,
        ..FixtureSpec::default()
    });

    fx.orchestrator.init().await.unwrap();

    // Bottom of stream, boundary armed one past the rendered range.
    assert_eq!(fx.orchestrator.engine().min_line(), 51);
    assert_eq!(view_lines(&fx.view).len(), 50);
    assert!(fx.orchestrator.scroll().at_bottom_edge());

    // A live subscription is established.
    assert!(fx.orchestrator.is_listening());
    assert_eq!(calls_matching(&fx.log, "feed.subscribe").len(), 1);

    // The surface was rebuilt from the last page.
    let rendered: Vec<String> = calls_matching(&fx.log, "render.");
    assert_eq!(rendered, ["render.clear", "render.append:50"]);
}

#[tokio::test]
async fn queued_job_starts_at_the_top_and_listens() {
    let mut fx = fixture(FixtureSpec {
        state: JobState::Pending,
        ..FixtureSpec::default()
    });

    fx.orchestrator.init().await.unwrap();

    assert!(fx.orchestrator.is_listening());
    assert!(!fx.orchestrator.engine().is_active());
    assert_eq!(calls_matching(&fx.log, "store.first").len(), 1);
    assert!(calls_matching(&fx.log, "render.").is_empty());

    // First live event: attaches lazily and renders straight away.
    fx.orchestrator
        .handle_job_event(span_event(1, 1, 1))
        .await
        .unwrap();

    assert!(fx.orchestrator.is_streaming());
    assert!(fx.orchestrator.engine().is_active());
    assert_eq!(view_lines(&fx.view), ["line 1"]);
    assert!(calls(&fx.log).contains(&"status.set:Running".to_string()));
}

#[tokio::test]
async fn concurrent_arrivals_share_a_single_attach() {
    let mut fx = fixture(FixtureSpec {
        events: line_events(50),
        state: JobState::Running,
        ..FixtureSpec::default()
    });

    fx.orchestrator.init().await.unwrap();
    let fetches_after_init = calls_matching(&fx.log, "store.last").len();
    assert_eq!(fetches_after_init, 1);

    for line in 51..=53 {
        fx.orchestrator
            .handle_job_event(span_event(line, line, line))
            .await
            .unwrap();
    }

    // Exactly one attach fetch beyond init, one subscription overall.
    assert_eq!(calls_matching(&fx.log, "store.last").len(), 2);
    assert_eq!(calls_matching(&fx.log, "feed.subscribe").len(), 1);
    assert_eq!(fx.orchestrator.engine().min_line(), 51);

    // The attach re-fetch must not duplicate already-rendered lines.
    let lines = view_lines(&fx.view);
    let dupes = lines.iter().filter(|line| *line == "line 50").count();
    assert_eq!(dupes, 1);
    assert_eq!(lines.last().map(String::as_str), Some("line 53"));

    // Live follow keeps the anchor paused against reactive fetches.
    assert!(fx.orchestrator.scroll().is_paused());
}

#[tokio::test]
async fn events_below_the_boundary_never_reach_the_surface() {
    let mut fx = fixture(FixtureSpec {
        events: vec![span_event(1, 1, 50)],
        state: JobState::Running,
        ..FixtureSpec::default()
    });

    fx.orchestrator.init().await.unwrap();

    // A replayed event from the already-rendered range...
    fx.orchestrator
        .handle_job_event(span_event(2, 30, 30))
        .await
        .unwrap();
    // ...and a genuinely new one.
    fx.orchestrator
        .handle_job_event(span_event(3, 51, 51))
        .await
        .unwrap();

    let appends = calls_matching(&fx.log, "render.append");
    assert_eq!(appends, ["render.append:50", "render.append:0", "render.append:1"]);

    let lines = view_lines(&fx.view);
    assert_eq!(lines.len(), 51);
    assert_eq!(lines.iter().filter(|line| *line == "line 30").count(), 1);
}

#[tokio::test]
async fn stream_stop_tears_down_and_dispatches_stats() {
    let mut fx = fixture(FixtureSpec {
        events: vec![span_event(1, 1, 50)],
        state: JobState::Running,
        ..FixtureSpec::default()
    });

    fx.orchestrator.init().await.unwrap();
    fx.orchestrator
        .handle_job_event(span_event(2, 51, 51))
        .await
        .unwrap();
    assert!(fx.orchestrator.engine().is_active());

    fx.orchestrator.handle_status_event(StatusEvent {
        state: JobState::Successful,
        finished: None,
    });

    assert!(!fx.orchestrator.engine().is_active());
    assert!(!fx.orchestrator.is_listening());
    assert!(!fx.orchestrator.scroll().is_paused());

    let log = calls(&fx.log);
    assert!(log.contains(&"status.update_stats".to_string()));
    assert!(log.contains(&"status.dispatch".to_string()));

    // Teardown is idempotent.
    fx.orchestrator.stop_listening();
    assert!(!fx.orchestrator.is_listening());
}

#[tokio::test]
async fn resubscribing_always_replaces_the_prior_subscription() {
    let mut fx = fixture(FixtureSpec {
        events: vec![span_event(1, 1, 50)],
        state: JobState::Running,
        ..FixtureSpec::default()
    });
    fx.orchestrator.init().await.unwrap();

    fx.orchestrator.start_listening().await.unwrap();
    fx.orchestrator.start_listening().await.unwrap();

    assert_eq!(calls_matching(&fx.log, "feed.subscribe").len(), 3);
    assert!(fx.orchestrator.is_listening());
}

#[tokio::test]
async fn fetch_failure_rejects_the_sequence_without_partial_state() {
    let log = call_log();
    let view = shared_view(20);
    let (feed, _publisher) = HarnessFeed::new(log.clone());
    let config = ViewerConfig {
        capacity: 100,
        page_size: 10,
        ..ViewerConfig::default()
    };

    let mut orchestrator = Orchestrator::new(
        Box::new(FailingStore),
        Box::new(HarnessViewport::new(view.clone())),
        Box::new(HarnessSurface::new(view.clone(), log.clone())),
        Box::new(ScriptedStatus::new(JobState::Running, log.clone())),
        Box::new(feed),
        &config,
    );

    let err = orchestrator.init().await.unwrap_err();
    assert!(matches!(err, ViewerError::Fetch(_)));

    // Surface and window accounting agree: nothing is materialized.
    assert!(view_lines(&view).is_empty());
    assert_eq!(orchestrator.page().rendered_lines(), 0);
    assert!(!orchestrator.is_listening());
}
