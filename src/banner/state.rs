use serde::Serialize;

use crate::schedule::model::{Course, ScheduleData};
use crate::schedule::query::{
    WallTime, active_courses, courses_starting_soon, time_remaining_in_course, time_until_course,
};
use crate::schedule::time::{ClockTime, TimeFormat, format_minutes, format_time};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerLine {
    pub code: String,
    pub name: String,
    pub lecturer: String,
    pub location: String,
    pub time_range: String,
    pub minutes: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BannerView {
    pub clock: String,
    pub format: TimeFormat,
    pub active: Vec<BannerLine>,
    pub starting_soon: Vec<BannerLine>,
}

#[derive(Debug, Clone)]
struct HeldCourse {
    course: Course,
    minutes: u32,
}

/// What one mounted banner currently shows.
///
/// `poll` re-queries the schedule; `apply_format` only re-renders what is
/// already held.
#[derive(Debug, Clone)]
pub struct BannerState {
    format: TimeFormat,
    clock: Option<ClockTime>,
    active: Vec<HeldCourse>,
    starting_soon: Vec<HeldCourse>,
    polls: u64,
    format_changes: u64,
}

impl BannerState {
    pub fn new(format: TimeFormat) -> Self {
        Self {
            format,
            clock: None,
            active: Vec::new(),
            starting_soon: Vec::new(),
            polls: 0,
            format_changes: 0,
        }
    }

    pub fn poll(&mut self, schedule: Option<&ScheduleData>, now: WallTime) {
        self.polls += 1;
        self.clock = Some(now.time);
        let Some(schedule) = schedule else {
            self.active.clear();
            self.starting_soon.clear();
            return;
        };

        self.active = active_courses(schedule, now)
            .into_iter()
            .filter_map(|course| {
                time_remaining_in_course(course, now).map(|minutes| HeldCourse {
                    course: course.clone(),
                    minutes,
                })
            })
            .collect();
        self.starting_soon = courses_starting_soon(schedule, now)
            .into_iter()
            .filter_map(|course| {
                time_until_course(course, now).map(|minutes| HeldCourse {
                    course: course.clone(),
                    minutes,
                })
            })
            .collect();
    }

    pub fn apply_format(&mut self, format: TimeFormat, clock: Option<ClockTime>) {
        self.format = format;
        self.format_changes += 1;
        if clock.is_some() {
            self.clock = clock;
        }
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.starting_soon.clear();
    }

    pub fn format(&self) -> TimeFormat {
        self.format
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn format_changes(&self) -> u64 {
        self.format_changes
    }

    /// `None` when there is nothing to show.
    pub fn view(&self) -> Option<BannerView> {
        if self.active.is_empty() && self.starting_soon.is_empty() {
            return None;
        }

        Some(BannerView {
            clock: self
                .clock
                .map(|time| format_time(time, self.format))
                .unwrap_or_default(),
            format: self.format,
            active: self
                .active
                .iter()
                .map(|held| self.line(held, "Berakhir dalam"))
                .collect(),
            starting_soon: self
                .starting_soon
                .iter()
                .map(|held| self.line(held, "Dimulai dalam"))
                .collect(),
        })
    }

    fn line(&self, held: &HeldCourse, prefix: &str) -> BannerLine {
        let course = &held.course;
        BannerLine {
            code: course.code.clone(),
            name: course.name.clone(),
            lecturer: course.lecturer.display_name(),
            location: course.location.display(),
            time_range: format!(
                "{} - {}",
                format_time(course.start_time, self.format),
                format_time(course.end_time, self.format)
            ),
            minutes: held.minutes,
            label: format!("{prefix} {}", minutes_label(held.minutes)),
        }
    }
}

fn minutes_label(minutes: u32) -> String {
    if minutes < 1 {
        return "kurang dari 1 menit".to_string();
    }
    format_minutes(minutes)
}
