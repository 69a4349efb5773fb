use jtx_core::db::open_db_in_memory;
use jtx_core::repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
use jtx_core::service::review::{ReviewGate, NEXT_REVIEW_REQUEST_KEY};
use jtx_core::{ReviewError, ReviewInfo, ReviewOutcome, ReviewPlatform, ReviewPolicy, ReviewScheduler};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const NOW: i64 = 1_709_649_000_000;

#[derive(Default)]
struct FakePlatform {
    fail_request: bool,
    fail_launch: bool,
    requests: usize,
    launches: usize,
}

impl ReviewPlatform for FakePlatform {
    fn request_review_flow(&mut self) -> Result<ReviewInfo, ReviewError> {
        self.requests += 1;
        if self.fail_request {
            return Err(ReviewError::Platform("play services missing".to_string()));
        }
        Ok(ReviewInfo {
            token: "flow".to_string(),
        })
    }

    fn launch_review_flow(&mut self, info: &ReviewInfo) -> Result<(), ReviewError> {
        assert_eq!(info.token, "flow");
        self.launches += 1;
        if self.fail_launch {
            return Err(ReviewError::Platform("activity gone".to_string()));
        }
        Ok(())
    }
}

#[test]
fn first_launch_only_schedules() {
    let conn = open_db_in_memory().unwrap();
    let scheduler = ReviewScheduler::new(SqliteSettingsRepository::new(&conn), ReviewPolicy::default());
    let mut platform = FakePlatform::default();

    let outcome = scheduler.launch(&mut platform, NOW).unwrap();
    assert_eq!(
        outcome,
        ReviewOutcome::FirstScheduled {
            next_request_on: NOW + 30 * DAY_MS
        }
    );
    assert_eq!(platform.requests, 0);
    assert_eq!(
        SqliteSettingsRepository::new(&conn)
            .get_i64(NEXT_REVIEW_REQUEST_KEY)
            .unwrap(),
        Some(NOW + 30 * DAY_MS)
    );
}

#[test]
fn prompt_waits_for_the_gate_and_then_cools_down() {
    let conn = open_db_in_memory().unwrap();
    let scheduler = ReviewScheduler::new(SqliteSettingsRepository::new(&conn), ReviewPolicy::default());
    let mut platform = FakePlatform::default();

    scheduler.launch(&mut platform, NOW).unwrap();
    assert!(matches!(
        scheduler.launch(&mut platform, NOW + 29 * DAY_MS).unwrap(),
        ReviewOutcome::NotYet { .. }
    ));
    assert_eq!(platform.requests, 0);

    let due = NOW + 30 * DAY_MS;
    assert_eq!(
        scheduler.launch(&mut platform, due).unwrap(),
        ReviewOutcome::Launched {
            next_request_on: due + 90 * DAY_MS
        }
    );
    assert_eq!(platform.requests, 1);
    assert_eq!(platform.launches, 1);

    // A second launch inside the cooldown never reaches the platform.
    assert!(matches!(
        scheduler.launch(&mut platform, due + DAY_MS).unwrap(),
        ReviewOutcome::NotYet { .. }
    ));
    assert_eq!(platform.requests, 1);
}

#[test]
fn failed_request_keeps_schedule() {
    let conn = open_db_in_memory().unwrap();
    let settings = SqliteSettingsRepository::new(&conn);
    settings.set_i64(NEXT_REVIEW_REQUEST_KEY, NOW - 1).unwrap();
    let scheduler = ReviewScheduler::new(settings, ReviewPolicy::default());
    let mut platform = FakePlatform {
        fail_request: true,
        ..FakePlatform::default()
    };

    assert_eq!(
        scheduler.launch(&mut platform, NOW).unwrap(),
        ReviewOutcome::RequestFailed
    );
    assert_eq!(scheduler.next_request_on().unwrap(), Some(NOW - 1));
    assert_eq!(scheduler.evaluate(NOW).unwrap(), ReviewGate::Due);
}

#[test]
fn failed_launch_still_reschedules() {
    let conn = open_db_in_memory().unwrap();
    let settings = SqliteSettingsRepository::new(&conn);
    settings.set_i64(NEXT_REVIEW_REQUEST_KEY, NOW).unwrap();
    let scheduler = ReviewScheduler::new(settings, ReviewPolicy::default());
    let mut platform = FakePlatform {
        fail_launch: true,
        ..FakePlatform::default()
    };

    assert!(matches!(
        scheduler.launch(&mut platform, NOW).unwrap(),
        ReviewOutcome::Launched { .. }
    ));
    assert_eq!(scheduler.next_request_on().unwrap(), Some(NOW + 90 * DAY_MS));
}

#[test]
fn zero_is_treated_as_unset_and_policy_is_configurable() {
    let conn = open_db_in_memory().unwrap();
    let settings = SqliteSettingsRepository::new(&conn);
    settings.set_i64(NEXT_REVIEW_REQUEST_KEY, 0).unwrap();
    let scheduler = ReviewScheduler::new(
        settings,
        ReviewPolicy {
            days_to_first_request: 1,
            days_to_next_request: 2,
        },
    );

    assert_eq!(
        scheduler.evaluate(NOW).unwrap(),
        ReviewGate::FirstScheduled {
            next_request_on: NOW + DAY_MS
        }
    );
    assert_eq!(
        scheduler.record_review_requested(NOW).unwrap(),
        NOW + 2 * DAY_MS
    );
}

#[test]
fn far_future_clock_clamps_schedule() {
    let conn = open_db_in_memory().unwrap();
    let scheduler = ReviewScheduler::new(SqliteSettingsRepository::new(&conn), ReviewPolicy::default());

    assert_eq!(
        scheduler.evaluate(i64::MAX).unwrap(),
        ReviewGate::FirstScheduled {
            next_request_on: i64::MAX
        }
    );
    assert_eq!(scheduler.record_review_requested(i64::MAX).unwrap(), i64::MAX);
    assert_eq!(
        scheduler.evaluate(i64::MAX - 1).unwrap(),
        ReviewGate::NotYet {
            next_request_on: i64::MAX
        }
    );
}
