//! Background liveness timer.

use super::RouterInner;
use crate::Result;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// Periodically runs `tick` on the router. Stops when dropped or when the
/// router itself is gone.
pub struct LivenessTimer {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl LivenessTimer {
    pub(crate) fn spawn(router: Weak<RouterInner>, interval: Duration) -> Result<Self> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("midibay-liveness".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(inner) = router.upgrade() else {
                            debug!("Router dropped, liveness timer exiting");
                            break;
                        };
                        inner.state.lock().tick(Instant::now());
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for LivenessTimer {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
