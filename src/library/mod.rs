//! Directory browsing under a sandboxed media root.

mod listing;
mod sandbox;

pub use listing::{list_directory, MediaEntry};
pub use sandbox::{PathError, Resolved, Sandbox};
