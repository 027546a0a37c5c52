pub mod config;
pub mod date;
pub mod drag;
pub mod item;
pub mod lanes;
pub mod viewport;

pub use config::TimelineConfig;
pub use drag::{DragController, DragKind, DragState, EditKey, InputCapture, PointerId, PointerTarget};
pub use item::{Item, ItemId, ItemRecord, ItemStore};
pub use lanes::{LaneLayout, LaneOptions, LaneSet, PlacedItem};
pub use viewport::{TimelineViewport, ZoomDirection, ZoomStep};
