//! Configuration section definitions.
//!
//! Each module corresponds to a section in `livelink.toml`:
//!
//! | Module      | TOML Section   | Purpose                                  |
//! |-------------|----------------|------------------------------------------|
//! | `live`      | `[live]`       | Compilation database, signal reload      |
//! | `watch`     | `[watch]`      | Monitored directories, watcher lifecycle |
//! | `toolchain` | `[toolchain]`  | Linker, link flags, nm, reload output    |

mod live;
mod toolchain;
mod watch;

pub use live::LiveSectionConfig;
pub use toolchain::ToolchainConfig;
pub use watch::WatchConfig;
pub(crate) use watch::MIN_RECREATE_TICKS;
