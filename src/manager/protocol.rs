//! Supervisor wire protocol
//!
//! Outbound: one telemetry line per tick, `<count>:<mode>:<fps>\n`.
//! Inbound: any byte stream; the termination marker anywhere in a read, an
//! end-of-stream, or a read error halts the process.

use std::io;

use crate::server::HaltReason;

/// Decide what a listener read means.
///
/// Returns `None` when the read carried only unrelated bytes.
pub fn inspect_read(read: &io::Result<usize>, buf: &[u8], marker: u8) -> Option<HaltReason> {
    match read {
        Ok(0) => Some(HaltReason::SupervisorClosed),
        Ok(n) => {
            let data = &buf[..(*n).min(buf.len())];
            if data.contains(&marker) {
                Some(HaltReason::TerminationMarker)
            } else {
                None
            }
        }
        Err(_) => Some(HaltReason::SupervisorReadError),
    }
}
