//! Decoding of the visual timetable grid into schedule records.

pub mod block;
pub mod dom;
pub mod errors;
pub mod extract;
pub mod geometry;
pub mod models;
pub mod table;

pub use block::{HeaderOverride, decode_block};
pub use errors::{BlockError, GeometryError, TableTypeError};
pub use geometry::GridConfig;
pub use models::{Entity, ScheduleEntry, TimeSlot};
pub use table::{PageSummary, TableDecoder, TableType};
