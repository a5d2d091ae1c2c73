//! Capture inspection pipeline: parsing, editing, streaming, and replay

pub mod draft;
pub mod list;
pub mod raw;
pub mod replay;
pub mod rows;
pub mod stream;

pub use draft::{Inspector, Tab, ViewMode};
pub use list::CaptureList;
pub use replay::ReplayExecutor;
pub use rows::RowField;
pub use stream::{RequestStore, StoreEvent, StreamConsumer};
