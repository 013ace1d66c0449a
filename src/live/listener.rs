//! Host notifications.

use crate::event::LogSeverity;
use crate::logger::{self, log_severity};

/// Receives orchestrator output on the thread calling `Live::update`.
pub trait LiveListener: Send {
    fn on_log(&mut self, severity: LogSeverity, message: &str) {
        let _ = (severity, message);
    }

    /// A link finished and loading is about to start.
    fn on_code_pre_load(&mut self) {}

    /// Loading finished, successfully or not.
    fn on_code_post_load(&mut self) {}
}

/// Prints through the logger and shows each reload outcome as a status block.
#[derive(Debug, Default)]
pub struct ConsoleListener {
    loading: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LiveListener for ConsoleListener {
    fn on_log(&mut self, severity: LogSeverity, message: &str) {
        log_severity(severity, message);
        logger::status_detach();

        if self.loading {
            match severity {
                LogSeverity::Error => self.errors.push(message.to_string()),
                LogSeverity::Warning => self.warnings.push(message.to_string()),
                LogSeverity::Debug | LogSeverity::Info => {}
            }
        }
    }

    fn on_code_pre_load(&mut self) {
        self.loading = true;
        self.errors.clear();
        self.warnings.clear();
    }

    fn on_code_post_load(&mut self) {
        self.loading = false;
        if !self.errors.is_empty() {
            logger::status_error("reload failed", &self.errors.join("\n"));
        } else if let Some(warning) = self.warnings.last() {
            logger::status_warning(warning);
        } else {
            logger::status_success("code reloaded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_problems_only_while_loading() {
        let mut listener = ConsoleListener::new();
        listener.on_log(LogSeverity::Error, "before");
        assert!(listener.errors.is_empty());

        listener.on_code_pre_load();
        listener.on_log(LogSeverity::Warning, "Nothing to reload");
        listener.on_log(LogSeverity::Error, "undefined symbol");
        listener.on_log(LogSeverity::Info, "noise");
        assert_eq!(listener.errors, vec!["undefined symbol"]);
        assert_eq!(listener.warnings, vec!["Nothing to reload"]);

        listener.on_code_post_load();
        assert!(!listener.loading);

        // Next reload starts clean
        listener.on_code_pre_load();
        assert!(listener.errors.is_empty() && listener.warnings.is_empty());
    }
}
