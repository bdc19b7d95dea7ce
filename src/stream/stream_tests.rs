use super::*;

fn event(counter: u64, start: u64, end: u64) -> JobEvent {
    JobEvent::new(counter, start, end, format!("event {counter}")).unwrap()
}

#[test]
fn new_engine_is_inactive_and_accepts_from_line_one() {
    let engine = StreamEngine::new();
    assert!(!engine.is_active());
    assert!(!engine.is_paused());
    assert!(!engine.is_transitioning());
    assert_eq!(engine.min_line(), 0);
}

#[test]
fn first_accepted_event_activates_and_fires_started_once() {
    let mut engine = StreamEngine::new();

    let frame = engine.push_job_event(event(1, 1, 2)).unwrap();
    assert_eq!(frame.len(), 1);
    assert!(engine.is_active());
    assert_eq!(engine.take_lifecycle_event(), Some(StreamLifecycle::Started));
    assert_eq!(engine.take_lifecycle_event(), None);

    engine.push_job_event(event(2, 3, 3)).unwrap();
    assert_eq!(engine.take_lifecycle_event(), None, "started fires once");
}

#[test]
fn events_below_min_line_are_discarded() {
    let mut engine = StreamEngine::new();
    engine.set_min_line(51);

    assert!(engine.push_job_event(event(1, 1, 50)).is_none());
    assert!(!engine.is_active(), "discarded events do not attach");

    let frame = engine.push_job_event(event(2, 51, 60)).unwrap();
    assert_eq!(frame[0].start_line, 51);
}

#[test]
fn paused_engine_buffers_until_resumed() {
    let mut engine = StreamEngine::new();
    engine.push_job_event(event(1, 1, 1)).unwrap();

    engine.pause(true);
    assert!(engine.is_paused());
    assert!(engine.push_job_event(event(2, 2, 2)).is_none());
    assert!(engine.push_job_event(event(3, 3, 3)).is_none());

    engine.resume(true);
    assert!(
        engine.is_transitioning(),
        "backlog keeps the engine transitioning until drained"
    );

    let frame = engine.take_frame().unwrap();
    assert_eq!(frame.len(), 2);
    assert!(!engine.is_transitioning());
}

#[test]
fn resume_without_backlog_is_not_a_transition() {
    let mut engine = StreamEngine::new();
    engine.push_job_event(event(1, 1, 1)).unwrap();

    engine.pause(true);
    engine.resume(true);
    assert!(!engine.is_transitioning());
    assert!(engine.take_frame().is_none());
}

#[test]
fn take_frame_refilters_against_a_moved_boundary() {
    let mut engine = StreamEngine::new();
    engine.push_job_event(event(1, 1, 1)).unwrap();
    engine.pause(true);

    // Buffered behind the pause...
    engine.push_job_event(event(2, 2, 10)).unwrap();
    engine.push_job_event(event(3, 11, 20)).unwrap();

    // ...then a last-page fetch re-renders lines up through 10.
    engine.set_min_line(11);
    engine.resume(true);

    let frame = engine.take_frame().unwrap();
    assert_eq!(frame.len(), 1);
    assert_eq!(frame[0].start_line, 11);
}

#[test]
fn pause_and_resume_are_noops_when_inactive() {
    let mut engine = StreamEngine::new();
    engine.pause(true);
    engine.resume(true);
    assert!(!engine.is_active());
    assert!(!engine.is_transitioning());
}

#[test]
fn stop_ends_the_session_and_allows_a_new_one() {
    let mut engine = StreamEngine::new();
    engine.push_job_event(event(1, 1, 1)).unwrap();
    let _ = engine.take_lifecycle_event();

    engine.pause(true);
    engine.push_job_event(event(2, 2, 2));
    engine.stop();

    assert!(!engine.is_active());
    assert_eq!(engine.take_lifecycle_event(), Some(StreamLifecycle::Stopped));
    assert!(engine.take_frame().is_none(), "stop drops the backlog");

    // A later session starts cleanly.
    let frame = engine.push_job_event(event(3, 3, 3)).unwrap();
    assert_eq!(frame.len(), 1);
    assert_eq!(engine.take_lifecycle_event(), Some(StreamLifecycle::Started));
}

#[test]
fn stop_when_inactive_does_nothing() {
    let mut engine = StreamEngine::new();
    engine.stop();
    assert_eq!(engine.take_lifecycle_event(), None);
}
