//! Timetable records decoded from the grid pages.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A teacher, room, or year group referenced from a timetable page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Site-relative URL of the entity's own timetable, when the markup links to one.
    pub link: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, link: Option<String>) -> Self {
        Self {
            name: name.into(),
            link,
        }
    }
}

/// Position of an activity on the weekly grid.
///
/// `start` and `end` are minutes since midnight. `one_nth` is the number of
/// equal-width parallel slots sharing the day column (1 = full column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: u8,
    pub start: u32,
    pub end: u32,
    pub one_nth: u32,
    pub duration: u32,
}

impl TimeSlot {
    pub fn start_time(&self) -> Option<NaiveTime> {
        minutes_to_time(self.start)
    }

    pub fn end_time(&self) -> Option<NaiveTime> {
        minutes_to_time(self.end)
    }
}

fn minutes_to_time(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => write!(
                f,
                "day {} {}-{} (1/{})",
                self.day,
                start.format("%H:%M"),
                end.format("%H:%M"),
                self.one_nth
            ),
            _ => write!(
                f,
                "day {} {}-{} (1/{})",
                self.day, self.start, self.end, self.one_nth
            ),
        }
    }
}

/// One scheduled activity occurrence, as seen from a single timetable page.
///
/// The same real-world activity shows up once per page that lists it (its
/// room, each teacher, each year group); entries are not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub group_no: Option<String>,
    pub subject: Option<String>,
    pub teachers: Vec<Entity>,
    pub year_groups: Vec<Entity>,
    pub time: TimeSlot,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(rename = "type_short")]
    pub activity_type_short: String,
    pub room: Entity,
}
