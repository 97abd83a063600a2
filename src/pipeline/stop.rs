//! Stop signal shared between the frame loop and its controllers

use flume::{Receiver, Sender};

/// Raises the stop signal. Cheap to clone; any clone may stop the loop.
#[derive(Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

/// Checked by the frame loop at the top of every iteration.
pub struct StopSignal {
    rx: Receiver<()>,
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = flume::bounded(1);
    (StopHandle { tx }, StopSignal { rx })
}

impl StopHandle {
    /// Requests shutdown. Repeated calls are no-ops.
    pub fn stop(&self) {
        // Full means a stop is already pending
        let _ = self.tx.try_send(());
    }
}

impl StopSignal {
    /// Whether a stop was requested. Dropping every handle does not count.
    pub fn is_raised(&self) -> bool {
        !self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_once_any_handle_stops() {
        let (handle, signal) = stop_channel();
        let other = handle.clone();
        assert!(!signal.is_raised());
        other.stop();
        handle.stop();
        assert!(signal.is_raised());
        assert!(signal.is_raised());
    }

    #[test]
    fn dropped_handles_do_not_stop() {
        let (handle, signal) = stop_channel();
        drop(handle);
        assert!(!signal.is_raised());
    }
}
