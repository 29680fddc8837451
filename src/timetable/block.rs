//! Decoding of a single `.activity_block` element.

use super::dom::Fragment;
use super::errors::BlockError;
use super::extract::extract_entities;
use super::geometry::{GridConfig, decode_style};
use super::models::{Entity, ScheduleEntry};

/// Field of a [`ScheduleEntry`] supplied by page context instead of the block.
///
/// A teacher's timetable page does not repeat the teacher inside every block,
/// so the page header replaces the block's own teacher list; likewise for
/// year-group and room pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOverride {
    YearGroups(Vec<Entity>),
    Teachers(Vec<Entity>),
    Room(Entity),
}

impl HeaderOverride {
    /// Replace the overridden field, whatever the block said.
    pub fn apply(&self, entry: &mut ScheduleEntry) {
        match self {
            Self::YearGroups(groups) => entry.year_groups = groups.clone(),
            Self::Teachers(teachers) => entry.teachers = teachers.clone(),
            Self::Room(room) => entry.room = room.clone(),
        }
    }
}

/// Turn one activity block into a [`ScheduleEntry`].
pub fn decode_block<F: Fragment>(
    block: &F,
    header: Option<&HeaderOverride>,
    grid: &GridConfig,
) -> Result<ScheduleEntry, BlockError> {
    let style = block.attr("style").ok_or(BlockError::MissingStyle)?;
    let time = decode_style(&style, grid).map_err(|source| BlockError::Geometry {
        style: style.clone(),
        source,
    })?;

    let group_no = block.select_first(".activity_group").and_then(|g| g.text());
    let content = block.select_first(".activity_content");
    let text_of = |selector: &str| {
        content
            .as_ref()
            .and_then(|c| c.select_first(selector))
            .and_then(|n| n.text())
    };
    let entities_of = |selector: &str| {
        content
            .as_ref()
            .map(|c| extract_entities(&c.select(selector)))
            .unwrap_or_default()
    };

    let subject = text_of(".subject_content");
    let teachers = entities_of("div.teachers_content div");
    let year_groups = entities_of("div.students_content div");

    // The site's markup spells the class "containter".
    let bottom = content
        .as_ref()
        .and_then(|c| c.select_first("div.bottom_content_containter"));
    let room_node = bottom.as_ref().and_then(|b| b.select_first("div.room_content"));
    let room = Entity {
        name: room_node
            .as_ref()
            .and_then(|r| r.text())
            .unwrap_or_default(),
        link: room_node
            .as_ref()
            .and_then(|r| r.select_first("a"))
            .and_then(|a| a.attr("href")),
    };
    let type_anchor = bottom
        .as_ref()
        .and_then(|b| b.select_first("div.type_content a"));
    let activity_type = type_anchor
        .as_ref()
        .and_then(|a| a.attr("title"))
        .unwrap_or_default();
    let activity_type_short = type_anchor
        .as_ref()
        .and_then(|a| a.text())
        .unwrap_or_default();

    let mut entry = ScheduleEntry {
        group_no,
        subject,
        teachers,
        year_groups,
        time,
        activity_type,
        activity_type_short,
        room,
    };
    if let Some(header) = header {
        header.apply(&mut entry);
    }
    Ok(entry)
}
