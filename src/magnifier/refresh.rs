use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Period between refresh ticks for `rate_hz`; never shorter than 1 ms.
pub fn refresh_interval(rate_hz: u32) -> Duration {
    let millis = (1000 / rate_hz.max(1)).max(1);
    Duration::from_millis(u64::from(millis))
}

/// Something that delivers `TimerTick`s at a fixed period once started.
pub trait TickSource {
    fn start(&mut self, interval: Duration) -> Result<()>;
    fn stop(&mut self);
}

/// Re-asserts the active source rectangle on a fixed cadence, so the overlay
/// cannot drift even if an update was missed.
pub struct RefreshScheduler {
    interval: Duration,
    source: Box<dyn TickSource>,
    running: bool,
}

impl RefreshScheduler {
    pub fn new(refresh_rate: u32, source: Box<dyn TickSource>) -> Self {
        Self {
            interval: refresh_interval(refresh_rate),
            source,
            running: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        self.source
            .start(self.interval)
            .context("failed to start refresh timer")?;
        self.running = true;
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "refresh timer started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.source.stop();
        self.running = false;
        tracing::debug!("refresh timer stopped");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick source driven by hand; the handle sees how it was started.
#[derive(Clone, Default)]
pub struct ManualTickSource {
    state: Arc<ManualTickState>,
}

#[derive(Default)]
struct ManualTickState {
    starts: AtomicUsize,
    stops: AtomicUsize,
    last_interval_ms: AtomicUsize,
    running: AtomicBool,
}

impl ManualTickSource {
    pub fn start_count(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    pub fn last_interval(&self) -> Duration {
        Duration::from_millis(self.state.last_interval_ms.load(Ordering::SeqCst) as u64)
    }
}

impl TickSource for ManualTickSource {
    fn start(&mut self, interval: Duration) -> Result<()> {
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        self.state
            .last_interval_ms
            .store(interval.as_millis() as usize, Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        self.state.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(windows)]
pub use platform::ThreadTimer;

#[cfg(windows)]
mod platform {
    use super::TickSource;
    use anyhow::{anyhow, Result};
    use std::time::Duration;
    use windows::Win32::UI::WindowsAndMessaging::{KillTimer, SetTimer};

    /// Thread timer posting `WM_TIMER` with a null window to the calling
    /// thread's queue. Must be started and stopped on the UI thread.
    #[derive(Debug, Default)]
    pub struct ThreadTimer {
        id: Option<usize>,
    }

    impl TickSource for ThreadTimer {
        fn start(&mut self, interval: Duration) -> Result<()> {
            let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
            let id = unsafe { SetTimer(None, 0, millis, None) };
            if id == 0 {
                return Err(anyhow!(windows::core::Error::from_win32()));
            }
            self.id = Some(id);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(id) = self.id.take() {
                if let Err(err) = unsafe { KillTimer(None, id) } {
                    tracing::warn!(?err, "failed to kill refresh timer");
                }
            }
        }
    }
}
