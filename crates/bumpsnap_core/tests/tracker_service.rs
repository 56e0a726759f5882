use bumpsnap_core::{
    Clock, FixedClock, MemoryStore, PregnancyState, StateStore, TrackerConfig, TrackerError,
    TrackerService, Trimester, WeekMode,
};
use chrono::{NaiveDate, TimeDelta};

const KEY: &str = "bumpsnap_state";

fn clock_at(year: i32, month: u32, day: u32, hour: u32) -> FixedClock {
    FixedClock::at(
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap(),
    )
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn open<'a>(
    memory: &'a MemoryStore,
    config: TrackerConfig,
    clock: &'a FixedClock,
) -> TrackerService<'a, &'a FixedClock> {
    TrackerService::open(StateStore::new(KEY).with_backend(memory), config, clock)
}

#[test]
fn fresh_install_starts_from_defaults() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let tracker = open(&memory, TrackerConfig::default(), &clock);

    assert!(!tracker.restored());
    assert_eq!(tracker.state(), &PregnancyState::default());
    assert_eq!(tracker.current_week(), 1);
    assert_eq!(tracker.days_left(), None);
    assert_eq!(tracker.reminder_banner_week(), None);

    let summary = tracker.home_summary();
    assert_eq!(summary.headline, "1");
    assert_eq!(summary.subtitle, "Week 1");
    assert_eq!(summary.detail, "Due: --");
}

#[test]
fn invalid_due_date_keeps_previous_value() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);

    assert!(tracker.set_due_date_str("2025-06-01").unwrap().is_complete());
    let err = tracker.set_due_date_str("2023-02-30").unwrap_err();
    assert_eq!(err, TrackerError::InvalidDate("2023-02-30".to_string()));

    assert_eq!(tracker.state().due_date, Some(date(2025, 6, 1)));
    assert_eq!(tracker.state().start_date, Some(date(2024, 8, 25)));
    assert_eq!(tracker.home_summary().detail, "Due: Jun 1, 2025");
}

#[test]
fn saving_twice_in_one_week_replaces_the_photo() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.complete_setup(date(2025, 6, 1), 10);

    let first = tracker.save_photo("data:image/jpeg;base64,AAA", None).unwrap();
    assert_eq!(first.week, 10);
    assert_eq!(first.label, "Week 10");

    clock.advance(TimeDelta::try_hours(2).unwrap());
    let second = tracker
        .save_photo("data:image/jpeg;base64,BBB", Some("  sunday  "))
        .unwrap();
    assert_eq!(second.label, "sunday");

    assert_eq!(tracker.state().photos.len(), 1);
    assert_eq!(
        tracker.photo_for_week(10).unwrap().image_data,
        "data:image/jpeg;base64,BBB"
    );

    let reopened = open(&memory, TrackerConfig::default(), &clock);
    assert!(reopened.restored());
    assert_eq!(reopened.state(), tracker.state());
}

#[test]
fn empty_images_are_rejected() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);

    assert_eq!(
        tracker.save_photo("   ", None).unwrap_err(),
        TrackerError::EmptyImage
    );
    assert!(tracker.state().photos.is_empty());
    assert_eq!(memory.raw(KEY), None);
}

#[test]
fn photos_stay_sorted_by_week() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.complete_setup(date(2025, 6, 1), 20);

    for week in [20, 12, 31] {
        tracker.set_current_week(week).unwrap();
        tracker.save_photo("data:x", None).unwrap();
    }

    let weeks = tracker
        .state()
        .photos
        .iter()
        .map(|photo| photo.week)
        .collect::<Vec<_>>();
    assert_eq!(weeks, vec![12, 20, 31]);
}

#[test]
fn manual_week_changes_are_clamped() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);

    assert_eq!(tracker.change_week(5), Ok(6));
    assert_eq!(tracker.change_week(-100), Ok(1));
    assert_eq!(tracker.change_week(100), Ok(42));
    assert_eq!(tracker.set_current_week(0), Ok(1));
    assert_eq!(tracker.trimester(), Trimester::First);

    tracker.set_current_week(27).unwrap();
    assert_eq!(tracker.trimester(), Trimester::Third);
    let reopened = open(&memory, TrackerConfig::default(), &clock);
    assert_eq!(reopened.state().current_week, 27);
}

#[test]
fn date_derived_mode_follows_the_calendar() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2024, 8, 26, 10);
    let config = TrackerConfig::default().with_week_mode(WeekMode::DateDerived);
    let mut tracker = open(&memory, config, &clock);

    tracker.set_due_date(date(2025, 6, 1));
    assert_eq!(tracker.current_week(), 1);

    clock.set(date(2025, 1, 5).and_hms_opt(9, 0, 0).unwrap().and_utc());
    assert_eq!(tracker.current_week(), 20);
    assert_eq!(tracker.trimester(), Trimester::Second);

    assert_eq!(
        tracker.set_current_week(30),
        Err(TrackerError::ManualWeekDisabled)
    );
    assert_eq!(tracker.change_week(1), Err(TrackerError::ManualWeekDisabled));
}

#[test]
fn days_left_counts_partial_days_and_stops_at_zero() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 5, 30, 18);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.set_due_date(date(2025, 6, 1));

    assert_eq!(tracker.days_left(), Some(2));
    clock.advance(TimeDelta::try_days(10).unwrap());
    assert_eq!(tracker.days_left(), Some(0));
}

#[test]
fn born_transition_is_one_way() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.complete_setup(date(2025, 1, 20), 38);
    assert_eq!(tracker.reminder_banner_week(), Some(38));

    assert!(tracker.mark_born());
    let born_at = tracker.state().born_date;
    assert_eq!(born_at, Some(clock.now()));

    clock.advance(TimeDelta::try_days(1).unwrap());
    assert!(!tracker.mark_born());
    assert_eq!(tracker.state().born_date, born_at);
    assert_eq!(tracker.reminder_banner_week(), None);

    let summary = tracker.home_summary();
    assert_eq!(summary.headline, "🎉");
    assert_eq!(summary.subtitle, "Baby is here!");
    assert_eq!(summary.detail, "Born Jan 5, 2025");
}

#[test]
fn reset_persists_a_fresh_document() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.complete_setup(date(2025, 6, 1), 10);
    tracker.save_photo("data:x", None).unwrap();

    assert!(tracker.reset().is_complete());
    assert_eq!(tracker.state(), &PregnancyState::default());

    let reopened = open(&memory, TrackerConfig::default(), &clock);
    assert_eq!(reopened.state(), &PregnancyState::default());
}

#[test]
fn gallery_groups_consecutive_photos_by_capture_month() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);
    tracker.complete_setup(date(2025, 6, 1), 10);

    tracker.save_photo("data:a", None).unwrap();
    clock.advance(TimeDelta::try_days(7).unwrap());
    tracker.change_week(1).unwrap();
    tracker.save_photo("data:b", None).unwrap();
    clock.advance(TimeDelta::try_days(21).unwrap());
    tracker.change_week(1).unwrap();
    tracker.save_photo("data:c", None).unwrap();

    let sections = tracker.gallery_sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].label, "January 2025");
    assert_eq!(sections[0].photo_indices, vec![0, 1]);
    assert_eq!(sections[1].label, "February 2025");
    assert_eq!(sections[1].photo_indices, vec![2]);
}

#[test]
fn reload_picks_up_changes_from_another_owner() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut writer = open(&memory, TrackerConfig::default(), &clock);
    writer.complete_setup(date(2025, 6, 1), 10);

    let mut watcher = open(&memory, TrackerConfig::default(), &clock);
    assert_eq!(watcher.reminder_banner_week(), Some(10));

    writer.save_photo("data:x", None).unwrap();
    assert!(watcher.reload());
    assert!(watcher.has_photo_for_week(10));
    assert_eq!(watcher.reminder_banner_week(), None);
    assert!(!watcher.reload());
}

#[test]
fn reload_without_a_document_keeps_memory_state() {
    let memory = MemoryStore::new("memory");
    let clock = clock_at(2025, 1, 5, 9);
    let mut tracker = open(&memory, TrackerConfig::default(), &clock);

    assert!(!tracker.reload());
    assert!(!tracker.restored());
    assert_eq!(tracker.state(), &PregnancyState::default());
}
