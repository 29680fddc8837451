//! Harvester for the UMCS timetable site.
//!
//! The site renders every timetable as a weekly grid of absolutely positioned
//! blocks. [`crawler`] walks the site's listing pages to find every grid,
//! and [`timetable`] turns each grid back into [`ScheduleEntry`] records.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod logging;
pub mod net;
pub mod output;
pub mod timetable;
pub mod utils;

pub use timetable::ScheduleEntry;
