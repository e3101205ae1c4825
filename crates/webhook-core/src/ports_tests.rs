use super::*;

#[test]
fn system_clock_reports_a_recent_time() {
    let clock = SystemClock;
    let now = clock.now();
    assert!((Utc::now() - now).num_seconds().abs() < 5);
}
