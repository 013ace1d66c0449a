//! Path utilities.
//!
//! Pure functions for path manipulation.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `resolve_path`, `expand_tilde`)

pub mod fs;

pub use fs::{expand_tilde, normalize_path, resolve_path};
