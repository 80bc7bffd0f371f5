use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::time::{ClockTime, Day};

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("unable to read schedule file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON at line {line}, column {column}: {source}")]
    Json {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported schedule version {0}; expected version 1")]
    UnsupportedVersion(u32),
    #[error("course '{code}' has invalid {field} '{value}', expected HH:MM")]
    InvalidTime {
        code: String,
        field: &'static str,
        value: String,
    },
    #[error("course '{code}' must start before it ends ({start} >= {end})")]
    EmptyWindow {
        code: String,
        start: ClockTime,
        end: ClockTime,
    },
    #[error("course '{code}' is listed under {listed} but declares day {declared}")]
    DayMismatch {
        code: String,
        listed: Day,
        declared: Day,
    },
    #[error("course '{code}' has start_period {start} after end_period {end}")]
    PeriodOrder { code: String, start: u32, end: u32 },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum ScheduleType {
    #[default]
    Regular,
    Evening,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Lecturer {
    pub name: String,
    #[serde(default)]
    pub titles: Vec<String>,
}

impl Lecturer {
    /// Name followed by academic titles, e.g. `Budi Santoso, S.Kom, M.Kom`.
    pub fn display_name(&self) -> String {
        if self.titles.is_empty() {
            return self.name.clone();
        }
        format!("{}, {}", self.name, self.titles.join(", "))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub room: String,
    pub building: String,
}

impl Location {
    pub fn display(&self) -> String {
        format!("{}, {}", self.room, self.building)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub lecturer: Lecturer,
    pub location: Location,
    pub day: Day,
    pub start_period: u32,
    pub end_period: u32,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub schedule_type: ScheduleType,
    pub note: Option<String>,
}

/// One term's timetable. Per-day lists keep file order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleData {
    pub term: String,
    days: BTreeMap<Day, Vec<Course>>,
}

impl ScheduleData {
    pub fn new(term: impl Into<String>, courses: Vec<Course>) -> Self {
        let mut days: BTreeMap<Day, Vec<Course>> = BTreeMap::new();
        for course in courses {
            days.entry(course.day).or_default().push(course);
        }
        Self {
            term: term.into(),
            days,
        }
    }

    pub fn courses(&self, day: Day) -> &[Course] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_courses(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_courses() == 0
    }
}

pub fn load_schedule(path: &Path) -> Result<ScheduleData, ScheduleError> {
    let content = fs::read_to_string(path).map_err(|source| ScheduleError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_schedule_text(&content)
}

pub fn parse_schedule_text(content: &str) -> Result<ScheduleData, ScheduleError> {
    let raw = serde_json::from_str::<ScheduleFile>(content).map_err(|source| {
        ScheduleError::Json {
            line: source.line(),
            column: source.column(),
            source,
        }
    })?;

    if raw.version != 1 {
        return Err(ScheduleError::UnsupportedVersion(raw.version));
    }

    let mut days = BTreeMap::new();
    for (listed, entries) in raw.schedule {
        let mut courses = Vec::with_capacity(entries.len());
        for entry in entries {
            courses.push(entry.into_course(listed)?);
        }
        days.insert(listed, courses);
    }

    Ok(ScheduleData {
        term: raw.term,
        days,
    })
}

#[derive(Debug, Deserialize)]
struct ScheduleFile {
    version: u32,
    #[serde(default)]
    term: String,
    #[serde(default)]
    schedule: BTreeMap<Day, Vec<CourseFile>>,
}

#[derive(Debug, Deserialize)]
struct CourseFile {
    code: String,
    name: String,
    #[serde(default)]
    credits: u32,
    lecturer: Lecturer,
    location: Location,
    day: Day,
    #[serde(default)]
    start_period: u32,
    #[serde(default)]
    end_period: u32,
    start_time: String,
    end_time: String,
    #[serde(default)]
    schedule_type: ScheduleType,
    #[serde(default)]
    note: Option<String>,
}

impl CourseFile {
    fn into_course(self, listed: Day) -> Result<Course, ScheduleError> {
        if self.day != listed {
            return Err(ScheduleError::DayMismatch {
                code: self.code,
                listed,
                declared: self.day,
            });
        }
        if self.start_period > self.end_period {
            return Err(ScheduleError::PeriodOrder {
                code: self.code,
                start: self.start_period,
                end: self.end_period,
            });
        }

        let start_time = parse_course_time(&self.code, "start_time", &self.start_time)?;
        let end_time = parse_course_time(&self.code, "end_time", &self.end_time)?;
        if start_time >= end_time {
            return Err(ScheduleError::EmptyWindow {
                code: self.code,
                start: start_time,
                end: end_time,
            });
        }

        Ok(Course {
            code: self.code,
            name: self.name,
            credits: self.credits,
            lecturer: self.lecturer,
            location: self.location,
            day: self.day,
            start_period: self.start_period,
            end_period: self.end_period,
            start_time,
            end_time,
            schedule_type: self.schedule_type,
            note: self.note.filter(|note| !note.trim().is_empty()),
        })
    }
}

fn parse_course_time(code: &str, field: &'static str, value: &str) -> Result<ClockTime, ScheduleError> {
    value.parse().map_err(|_| ScheduleError::InvalidTime {
        code: code.to_string(),
        field,
        value: value.to_string(),
    })
}
