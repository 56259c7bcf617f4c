//! Immediate process halt
//!
//! The supervisor channel and OS signals end the process on purpose. That
//! is modelled as an effect distinct from error returns: whoever detects the
//! condition calls [`Halt::halt`] and does nothing further. The production
//! implementation, [`ProcessExit`], never returns.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Why the process is being halted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Supervisor sent the termination marker
    TerminationMarker,
    /// Supervisor closed the control connection
    SupervisorClosed,
    /// Reading the control connection failed
    SupervisorReadError,
    /// OS interrupt or terminate signal
    Signal,
}

impl HaltReason {
    pub fn exit_code(self) -> i32 {
        match self {
            HaltReason::SupervisorReadError => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HaltReason::TerminationMarker => "termination marker received",
            HaltReason::SupervisorClosed => "supervisor closed connection",
            HaltReason::SupervisorReadError => "supervisor read error",
            HaltReason::Signal => "termination signal",
        };
        f.write_str(s)
    }
}

/// Terminal action taken when the process must stop now
pub trait Halt: Send + Sync {
    fn halt(&self, reason: HaltReason);
}

/// Exits the process with [`HaltReason::exit_code`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Halt for ProcessExit {
    fn halt(&self, reason: HaltReason) {
        tracing::warn!(reason = %reason, "Halting process");
        std::process::exit(reason.exit_code());
    }
}

/// Records halt requests instead of exiting, for embedding and tests
#[derive(Debug, Default)]
pub struct RecordedHalt {
    reasons: Mutex<Vec<HaltReason>>,
}

impl RecordedHalt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reasons(&self) -> Vec<HaltReason> {
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<HaltReason> {
        self.reasons().last().copied()
    }
}

impl Halt for RecordedHalt {
    fn halt(&self, reason: HaltReason) {
        tracing::info!(reason = %reason, "Halt requested");
        self.reasons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason);
    }
}
