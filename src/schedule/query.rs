use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::schedule::model::{Course, ScheduleData};
use crate::schedule::time::{ClockTime, Day, format_minutes};

/// Lead window for "starting soon", in minutes.
pub const STARTING_SOON_MINUTES: u32 = 15;

/// Day and time-of-day the engine evaluates against.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WallTime {
    pub day: Day,
    pub time: ClockTime,
}

impl WallTime {
    pub fn new(day: Day, time: ClockTime) -> Self {
        Self { day, time }
    }

    pub fn minutes(&self) -> u32 {
        self.time.minutes()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.day, self.time)
    }
}

/// Parses `"<Day> HH:MM"`, e.g. `"Senin 09:00"`.
impl FromStr for WallTime {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (day, time) = input
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("invalid wall time '{input}', expected '<Day> HH:MM'"))?;
        Ok(Self {
            day: day.parse()?,
            time: time.parse()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum CourseStatus {
    OtherDay,
    Upcoming,
    StartingSoon,
    Active,
    Finished,
}

impl CourseStatus {
    pub fn label(self) -> &'static str {
        match self {
            CourseStatus::OtherDay => "other day",
            CourseStatus::Upcoming => "upcoming",
            CourseStatus::StartingSoon => "starting soon",
            CourseStatus::Active => "active",
            CourseStatus::Finished => "finished",
        }
    }
}

pub fn courses_for_day(schedule: &ScheduleData, day: Day) -> &[Course] {
    schedule.courses(day)
}

/// Stable sort by start time. Courses starting together keep their order.
pub fn sort_courses_by_time(courses: &[Course]) -> Vec<&Course> {
    let mut sorted: Vec<&Course> = courses.iter().collect();
    sorted.sort_by_key(|course| course.start_time.minutes());
    sorted
}

pub fn is_course_active(course: &Course, now: WallTime) -> bool {
    if course.day != now.day {
        return false;
    }
    let minutes = now.minutes();
    course.start_time.minutes() <= minutes && minutes <= course.end_time.minutes()
}

pub fn is_course_starting_soon(course: &Course, now: WallTime) -> bool {
    if course.day != now.day {
        return false;
    }
    let start = course.start_time.minutes();
    let minutes = now.minutes();
    start > minutes && start - minutes <= STARTING_SOON_MINUTES
}

/// Minutes until the course starts, counted only inside the starting-soon
/// window. `Some(0)` exactly at the start minute.
pub fn time_until_course(course: &Course, now: WallTime) -> Option<u32> {
    if course.day != now.day {
        return None;
    }
    course
        .start_time
        .minutes()
        .checked_sub(now.minutes())
        .filter(|until| *until <= STARTING_SOON_MINUTES)
}

pub fn time_remaining_in_course(course: &Course, now: WallTime) -> Option<u32> {
    if !is_course_active(course, now) {
        return None;
    }
    Some(course.end_time.minutes() - now.minutes())
}

pub fn active_courses(schedule: &ScheduleData, now: WallTime) -> Vec<&Course> {
    courses_for_day(schedule, now.day)
        .iter()
        .filter(|course| is_course_active(course, now))
        .collect()
}

pub fn courses_starting_soon(schedule: &ScheduleData, now: WallTime) -> Vec<&Course> {
    courses_for_day(schedule, now.day)
        .iter()
        .filter(|course| is_course_starting_soon(course, now))
        .collect()
}

/// First course, by start time, that starts strictly after `now`.
pub fn next_course(courses: &[Course], now: WallTime) -> Option<&Course> {
    sort_courses_by_time(courses)
        .into_iter()
        .find(|course| course.start_time.minutes() > now.minutes())
}

pub fn course_status(course: &Course, now: WallTime) -> CourseStatus {
    if course.day != now.day {
        CourseStatus::OtherDay
    } else if is_course_active(course, now) {
        CourseStatus::Active
    } else if is_course_starting_soon(course, now) {
        CourseStatus::StartingSoon
    } else if course.start_time.minutes() > now.minutes() {
        CourseStatus::Upcoming
    } else {
        CourseStatus::Finished
    }
}

pub fn format_time_remaining(minutes: i64) -> String {
    if minutes < 1 {
        return "less than 1 minute".to_string();
    }
    format_minutes(u32::try_from(minutes).unwrap_or(u32::MAX))
}
