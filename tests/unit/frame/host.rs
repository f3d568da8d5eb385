use super::*;

#[test]
fn manual_host_tracks_pending_requests() {
    let mut host = ManualHost::new();
    assert!(!host.pending());
    host.request_frame();
    host.request_frame();
    assert!(host.pending());
    assert_eq!(host.requests(), 2);
    assert!(host.take_request());
    assert!(!host.take_request());
}

#[test]
fn fixed_step_clock_starts_at_zero() {
    let mut clock = FixedStepClock::new(Duration::from_millis(16));
    assert_eq!(clock.now(), Duration::ZERO);
    assert_eq!(clock.now(), Duration::from_millis(16));
    assert_eq!(clock.now(), Duration::from_millis(32));
    assert_eq!(
        FixedStepClock::from_fps(50).now() + FixedStepClock::from_fps(50).step,
        Duration::from_millis(20)
    );
}

#[test]
fn monotonic_clock_never_goes_back() {
    let mut clock = MonotonicClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
