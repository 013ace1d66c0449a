//! Core types - pure abstractions shared across the codebase.

mod error;
mod state;

pub use error::ToolError;
pub use state::{is_shutdown, request_shutdown, setup_shutdown_handler};
