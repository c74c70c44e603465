//! Turning raw git-style diff text into per-file records, and rendering
//! those records for display one file at a time.

pub use processor::{file_id, process_diff};
pub use render::render_file;

mod processor;
mod render;
