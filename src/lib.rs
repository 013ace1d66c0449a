//! livelink - live code reloading for native programs.
//!
//! Watches the sources of a running program, recompiles the compilation
//! units affected by each change, links the fresh objects into a shared
//! library and loads it into the process.
//!
//! ```ignore
//! let config = LiveConfig::default();
//! let mut live = Live::new(Box::new(ConsoleListener::new()), config);
//! loop {
//!     live.update();
//!     if reload_key_pressed() {
//!         live.try_reload();
//!     }
//! }
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod dependency;
pub mod event;
pub mod live;
pub mod logger;
pub mod program;
pub mod reload;
pub mod unit;
pub mod utils;
pub mod watch;

pub use config::LiveConfig;
pub use event::{Event, EventQueue, LogRecord, LogSeverity};
pub use live::{ConsoleListener, Live, LiveBuilder, LiveContext, LiveListener};
pub use reload::{ReloadPipeline, ReloadStep};
