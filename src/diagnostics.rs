use std::fmt::Write;

use anyhow::Result;

use crate::banner::render::render_text;
use crate::banner::state::BannerState;
use crate::schedule::model::ScheduleData;
use crate::schedule::query::{
    WallTime, course_status, courses_for_day, next_course, sort_courses_by_time,
};
use crate::schedule::time::{Day, TimeFormat, calculate_duration, format_time};
use crate::time_provider::SelectedClock;

pub fn run_check(schedule: &ScheduleData, selected: &SelectedClock, format: TimeFormat) -> Result<()> {
    let now = selected.clock.now()?;
    print!("{}", build_report(schedule, now, selected.clock.label(), format));
    Ok(())
}

pub fn build_report(
    schedule: &ScheduleData,
    now: WallTime,
    clock_label: &str,
    format: TimeFormat,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "classbanner check");
    let _ = writeln!(out, "Term: {}", schedule.term);
    let _ = writeln!(out, "Clock source: {clock_label}");
    let _ = writeln!(
        out,
        "Evaluated at: {} {}",
        now.day,
        format_time(now.time, format)
    );
    let _ = writeln!(out, "Time format: {format}h");
    let _ = writeln!(out, "Courses per day:");
    for day in Day::ALL {
        let _ = writeln!(out, "  {day}: {}", schedule.courses(day).len());
    }

    let today = courses_for_day(schedule, now.day);
    let _ = writeln!(out, "Today ({}):", now.day);
    if today.is_empty() {
        let _ = writeln!(out, "  no courses");
    }
    for course in sort_courses_by_time(today) {
        let _ = writeln!(
            out,
            "  {} {} {} - {} ({}) [{}]",
            course.code,
            course.name,
            format_time(course.start_time, format),
            format_time(course.end_time, format),
            calculate_duration(course.start_time, course.end_time),
            course_status(course, now).label()
        );
    }

    match next_course(today, now) {
        Some(course) => {
            let _ = writeln!(
                out,
                "Next course: {} {} at {}",
                course.code,
                course.name,
                format_time(course.start_time, format)
            );
        }
        None => {
            let _ = writeln!(out, "Next course: none today");
        }
    }

    let mut banner = BannerState::new(format);
    banner.poll(Some(schedule), now);
    match banner.view() {
        Some(view) => {
            let _ = writeln!(out, "Banner:");
            out.push_str(&render_text(&view));
        }
        None => {
            let _ = writeln!(out, "Banner: hidden");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::model::parse_schedule_text;

    const SCHEDULE: &str = r#"
{
  "version": 1,
  "term": "2024/2025 Genap",
  "schedule": {
    "Selasa": [
      {
        "code": "IF3110", "name": "Pemrograman Web", "credits": 3,
        "lecturer": { "name": "Andi", "titles": ["M.Cs"] },
        "location": { "room": "Lab 1", "building": "Gedung D" },
        "day": "Selasa", "start_period": 5, "end_period": 6,
        "start_time": "13:00", "end_time": "14:40"
      },
      {
        "code": "IF3140", "name": "Sistem Basis Data", "credits": 3,
        "lecturer": { "name": "Dewi" },
        "location": { "room": "R.402", "building": "Gedung A" },
        "day": "Selasa", "start_period": 1, "end_period": 2,
        "start_time": "08:00", "end_time": "09:40"
      }
    ]
  }
}
"#;

    #[test]
    fn report_lists_today_sorted_with_status() {
        let schedule = parse_schedule_text(SCHEDULE).expect("schedule");
        let now: WallTime = "Selasa 08:30".parse().expect("wall time");
        let report = build_report(&schedule, now, "FIXED", TimeFormat::Hour24);

        assert!(report.contains("Term: 2024/2025 Genap"));
        assert!(report.contains("  Selasa: 2"));
        let first = report.find("IF3140").expect("morning course listed");
        let second = report.find("IF3110").expect("afternoon course listed");
        assert!(first < second);
        assert!(report.contains("08:00 - 09:40 (1 jam 40 menit) [active]"));
        assert!(report.contains("13:00 - 14:40 (1 jam 40 menit) [upcoming]"));
        assert!(report.contains("Next course: IF3110 Pemrograman Web at 13:00"));
        assert!(report.contains("Berakhir dalam 1 jam 10 menit"));
    }

    #[test]
    fn report_uses_twelve_hour_format_and_hides_idle_banner() {
        let schedule = parse_schedule_text(SCHEDULE).expect("schedule");
        let now: WallTime = "Selasa 16:00".parse().expect("wall time");
        let report = build_report(&schedule, now, "FIXED", TimeFormat::Hour12);

        assert!(report.contains("Evaluated at: Selasa 4:00 PM"));
        assert!(report.contains("1:00 PM - 2:40 PM"));
        assert!(report.contains("Next course: none today"));
        assert!(report.contains("Banner: hidden"));
    }
}
