pub mod app;
pub mod error;
pub mod model;
pub mod ui;

pub use error::{Result, TimelineError};
