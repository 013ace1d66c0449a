//! Reload on SIGUSR1.
//!
//! The handler only sets a flag; the next `Live::update` turns it into a
//! reload on the consumer thread.

use crate::emit;
use crate::event::EventQueue;

#[cfg(unix)]
pub(super) use unix::SignalReloader;

#[cfg(unix)]
mod unix {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    static REQUESTED: AtomicBool = AtomicBool::new(false);
    /// One process, one handler.
    static INSTALLED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_sigusr1(_: libc::c_int) {
        REQUESTED.store(true, Ordering::SeqCst);
    }

    /// Installed SIGUSR1 handler; restores the default action on drop.
    #[derive(Debug)]
    pub(in crate::live) struct SignalReloader {
        _private: (),
    }

    impl SignalReloader {
        pub(in crate::live) fn install(events: &EventQueue) -> Option<Self> {
            if INSTALLED.swap(true, Ordering::SeqCst) {
                emit!(events, Warning, "SIGUSR1 reload is already enabled elsewhere in this process");
                return None;
            }

            REQUESTED.store(false, Ordering::SeqCst);
            let handler: extern "C" fn(libc::c_int) = on_sigusr1;
            // SAFETY: the handler only touches an atomic.
            let previous = unsafe { libc::signal(libc::SIGUSR1, handler as libc::sighandler_t) };
            if previous == libc::SIG_ERR {
                INSTALLED.store(false, Ordering::SeqCst);
                emit!(events, Error, "Cannot install SIGUSR1 handler");
                return None;
            }

            emit!(events, Info, "Reload on SIGUSR1 enabled (kill -USR1 {})", std::process::id());
            Some(Self { _private: () })
        }

        /// Whether a signal arrived since the last call.
        pub(in crate::live) fn take_request(&self) -> bool {
            REQUESTED.swap(false, Ordering::SeqCst)
        }
    }

    impl Drop for SignalReloader {
        fn drop(&mut self) {
            // SAFETY: restoring the default disposition.
            unsafe {
                libc::signal(libc::SIGUSR1, libc::SIG_DFL);
            }
            REQUESTED.store(false, Ordering::SeqCst);
            INSTALLED.store(false, Ordering::SeqCst);
        }
    }

}

#[cfg(not(unix))]
#[derive(Debug)]
pub(super) struct SignalReloader;

#[cfg(not(unix))]
impl SignalReloader {
    pub(super) fn install(events: &EventQueue) -> Option<Self> {
        emit!(events, Warning, "Reload on signal is only supported on Unix");
        None
    }

    pub(super) fn take_request(&self) -> bool {
        false
    }
}
