//! Dynamic library loading.

use std::path::Path;

use super::DynamicLoader;
use crate::core::ToolError;

/// Opens libraries with global symbol visibility and never closes them.
///
/// Code from an older reload may still be running or referenced through
/// patched pointers, so handles are leaked on purpose.
#[derive(Debug, Default, Clone, Copy)]
pub struct DlopenLoader;

impl DlopenLoader {
    pub const fn new() -> Self {
        Self
    }
}

impl DynamicLoader for DlopenLoader {
    fn open(&mut self, path: &Path) -> Result<(), ToolError> {
        open_global(path).map_err(|e| ToolError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(unix)]
fn open_global(path: &Path) -> Result<(), libloading::Error> {
    use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: running library initializers is the point of a reload; the
    // library comes from our own link step.
    let library = unsafe { Library::open(Some(path), RTLD_NOW | RTLD_GLOBAL)? };
    let _ = library.into_raw();
    Ok(())
}

#[cfg(not(unix))]
fn open_global(path: &Path) -> Result<(), libloading::Error> {
    // SAFETY: see the unix variant.
    let library = unsafe { libloading::Library::new(path)? };
    std::mem::forget(library);
    Ok(())
}
