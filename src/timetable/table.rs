//! Timetable pages and their type-specific handling.
//!
//! Every grid page describes one year group, teacher, or room. Which one is
//! encoded as the numeric code in the page's URL (`/grid/<code>/...`), and
//! that page's header supplies the matching field of every entry on it.

use super::block::{HeaderOverride, decode_block};
use super::dom::{Document, Fragment};
use super::errors::TableTypeError;
use super::geometry::GridConfig;
use super::models::{Entity, ScheduleEntry};
use regex::Regex;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// Kind of timetable page, as encoded in its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableType {
    Students = 1,
    Teacher = 2,
    Classroom = 3,
}

impl TableType {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Wrap the page's header entity as the field it stands for on this kind of page.
    pub fn header_override(self, header: Entity) -> HeaderOverride {
        match self {
            Self::Students => HeaderOverride::YearGroups(vec![header]),
            Self::Teacher => HeaderOverride::Teachers(vec![header]),
            Self::Classroom => HeaderOverride::Room(header),
        }
    }
}

impl TryFrom<u32> for TableType {
    type Error = TableTypeError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Students),
            2 => Ok(Self::Teacher),
            3 => Ok(Self::Classroom),
            other => Err(TableTypeError::Unknown(other)),
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Students => "students",
            Self::Teacher => "teacher",
            Self::Classroom => "classroom",
        })
    }
}

/// The type code embedded in a grid link, if the link is one.
pub fn table_type_code(href: &str) -> Option<u32> {
    static GRID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"grid/(\d+)/").unwrap());

    GRID_RE.captures(href)?[1].parse().ok()
}

/// `url` relative to `base_url` when it lives under it, otherwise unchanged.
pub fn relative_link(url: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match url.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_owned(),
        _ => url.to_owned(),
    }
}

/// Outcome of decoding one timetable page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Entries accepted by the consumer.
    pub decoded: usize,
    pub skipped: usize,
    /// The consumer asked to stop before every block was visited.
    pub interrupted: bool,
}

/// Decodes timetable pages against a fixed site and grid layout.
#[derive(Debug, Clone)]
pub struct TableDecoder {
    base_url: String,
    grid: GridConfig,
}

impl TableDecoder {
    pub fn new(base_url: impl Into<String>, grid: GridConfig) -> Self {
        Self {
            base_url: base_url.into(),
            grid,
        }
    }

    /// The entity a page is about: its header label and its own URL.
    pub fn header_entity<F: Fragment>(&self, page: &F, page_url: &str) -> Entity {
        let name = page
            .select_first("#plan_header a")
            .and_then(|a| a.text())
            .unwrap_or_else(|| {
                warn!(url = page_url, "Timetable page has no header");
                String::new()
            });
        Entity {
            name,
            link: Some(relative_link(page_url, &self.base_url)),
        }
    }

    /// Decode every activity block on a page, handing each entry to `emit`
    /// as soon as it is built.
    ///
    /// Blocks that fail to decode are logged and skipped. Returning
    /// [`ControlFlow::Break`] from `emit` stops the page early.
    pub fn decode_page<F: Fragment>(
        &self,
        kind: TableType,
        page: &F,
        page_url: &str,
        mut emit: impl FnMut(ScheduleEntry) -> ControlFlow<()>,
    ) -> PageSummary {
        let header = kind.header_override(self.header_entity(page, page_url));
        let mut summary = PageSummary::default();

        for block in page.select(".activity_block") {
            match decode_block(&block, Some(&header), &self.grid) {
                Ok(entry) => {
                    trace!(url = page_url, slot = %entry.time, "Decoded activity block");
                    if emit(entry).is_break() {
                        summary.interrupted = true;
                        break;
                    }
                    summary.decoded += 1;
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(
                        url = page_url,
                        style = e.style().unwrap_or_default(),
                        error = ?e,
                        "Skipping undecodable activity block"
                    );
                }
            }
        }

        debug!(
            url = page_url,
            %kind,
            decoded = summary.decoded,
            skipped = summary.skipped,
            "Decoded timetable page"
        );
        summary
    }

    /// Parse a page body and decode it; see [`decode_page`](Self::decode_page).
    pub fn decode_html(
        &self,
        kind: TableType,
        body: &str,
        page_url: &str,
        emit: impl FnMut(ScheduleEntry) -> ControlFlow<()>,
    ) -> PageSummary {
        let document = Document::parse(body);
        self.decode_page(kind, &document.root(), page_url, emit)
    }
}
