use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use classbanner::banner::controller::{BannerConfig, mount};
use classbanner::banner::state::BannerView;
use classbanner::broadcast::FormatBus;
use classbanner::schedule::model::parse_schedule_text;
use classbanner::schedule::query::{
    WallTime, active_courses, courses_starting_soon, time_remaining_in_course, time_until_course,
};
use classbanner::schedule::time::{Day, TimeFormat};
use classbanner::settings::FormatToggle;
use classbanner::time_provider::FixedClock;

const TERM: &str = r#"
{
  "version": 1,
  "term": "2025/2026 Ganjil",
  "schedule": {
    "Senin": [
      {
        "code": "IF2101",
        "name": "Struktur Data",
        "credits": 3,
        "lecturer": { "name": "Budi Santoso", "titles": ["M.Kom"] },
        "location": { "room": "R.301", "building": "Gedung A" },
        "day": "Senin",
        "start_period": 1,
        "end_period": 2,
        "start_time": "08:00",
        "end_time": "10:00"
      }
    ]
  }
}
"#;

fn at(text: &str) -> WallTime {
    text.parse().expect("wall time")
}

#[test]
fn loaded_term_answers_monday_queries() {
    let schedule = parse_schedule_text(TERM).expect("schedule");

    let nine = at("Senin 09:00");
    let active = active_courses(&schedule, nine);
    assert_eq!(active.len(), 1);
    assert_eq!(time_remaining_in_course(active[0], nine), Some(60));

    let ten_to_eight = at("Senin 07:50");
    let soon = courses_starting_soon(&schedule, ten_to_eight);
    assert_eq!(soon.len(), 1);
    assert_eq!(time_until_course(soon[0], ten_to_eight), Some(10));

    let half_past_seven = at("Senin 07:30");
    assert!(active_courses(&schedule, half_past_seven).is_empty());
    assert!(courses_starting_soon(&schedule, half_past_seven).is_empty());
    let course = &schedule.courses(Day::Senin)[0];
    assert_eq!(time_until_course(course, half_past_seven), None);
    assert_eq!(time_remaining_in_course(course, half_past_seven), None);
}

#[test]
fn toggle_reaches_a_mounted_banner_without_touching_its_lists() {
    let schedule = Arc::new(parse_schedule_text(TERM).expect("schedule"));
    let bus = FormatBus::new();
    let toggle = FormatToggle::new(None, bus.clone(), TimeFormat::Hour24);
    let (tx, rx) = mpsc::channel::<Option<BannerView>>();

    let handle = mount(
        BannerConfig {
            schedule: Some(schedule),
            clock: Arc::new(FixedClock::new(at("Senin 09:00"))),
            format: toggle.current(),
            poll_interval: Duration::from_secs(30),
        },
        &bus,
        Box::new(move |view: Option<&BannerView>| {
            let _ = tx.send(view.cloned());
        }),
    );

    let first = rx
        .recv_timeout(Duration::from_secs(1))
        .expect("mount render")
        .expect("banner shown");
    assert_eq!(first.clock, "09:00");

    assert_eq!(toggle.toggle(), TimeFormat::Hour12);
    let second = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("format render")
        .expect("banner shown");
    assert_eq!(second.clock, "9:00 AM");
    assert_eq!(second.active.len(), first.active.len());
    assert_eq!(second.active[0].code, first.active[0].code);
    assert_eq!(second.active[0].minutes, first.active[0].minutes);
    assert_eq!(handle.polls(), 1);

    drop(handle);
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn banner_without_schedule_stays_hidden_across_polls() {
    let bus = FormatBus::new();
    let handle = mount(
        BannerConfig {
            schedule: None,
            clock: Arc::new(FixedClock::new(at("Senin 09:00"))),
            format: TimeFormat::Hour24,
            poll_interval: Duration::from_millis(20),
        },
        &bus,
        Box::new(|view: Option<&BannerView>| assert!(view.is_none())),
    );

    let deadline = Instant::now() + Duration::from_secs(3);
    while handle.polls() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(handle.polls() >= 3);
    assert!(handle.view().is_none());
}
