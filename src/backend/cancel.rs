//! Cooperative cancellation for a harness run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Shared flag checked before each fixture starts and polled by backends.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Run-level deadline that fires a [`CancelToken`] from a watchdog thread.
///
/// Dropping the `Deadline` disarms it.
#[derive(Debug)]
pub struct Deadline {
    disarmed: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Deadline {
    const TICK: Duration = Duration::from_millis(20);

    #[must_use]
    pub fn arm(token: CancelToken, after: Duration) -> Self {
        let disarmed = Arc::new(AtomicBool::new(false));
        let watch = Arc::clone(&disarmed);
        let handle = thread::Builder::new()
            .name("dh-deadline".to_string())
            .spawn(move || {
                let expires = Instant::now() + after;
                while Instant::now() < expires {
                    if watch.load(Ordering::SeqCst) || token.is_cancelled() {
                        return;
                    }
                    thread::sleep(Self::TICK.min(expires.saturating_duration_since(Instant::now())));
                }
                if !watch.load(Ordering::SeqCst) {
                    warn!(deadline_ms = after.as_millis(), "Run deadline reached, cancelling");
                    token.cancel();
                }
            })
            .ok();
        Self { disarmed, handle }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.disarmed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
