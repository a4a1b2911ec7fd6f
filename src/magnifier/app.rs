use crate::magnifier::config::ViewportConfig;
use crate::magnifier::event::ViewportEvent;
use crate::magnifier::geometry::Point;
use crate::magnifier::state::{Transition, ViewportController};
use crate::magnifier::surface::OverlaySurface;
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};

/// Single consumer of the viewport event queue.
///
/// Hooks and timers only enqueue; every state change happens here, one event
/// at a time, on the thread that owns the pump.
pub struct EventPump<S> {
    controller: ViewportController<S>,
    events: Receiver<ViewportEvent>,
    disconnected: bool,
}

impl<S: OverlaySurface> EventPump<S> {
    pub fn new(controller: ViewportController<S>, events: Receiver<ViewportEvent>) -> Self {
        Self {
            controller,
            events,
            disconnected: false,
        }
    }

    pub fn controller(&self) -> &ViewportController<S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewportController<S> {
        &mut self.controller
    }

    pub fn dispatch(&mut self, event: ViewportEvent) -> Transition {
        let transition = self.controller.handle(event);
        tracing::trace!(?event, ?transition, "event dispatched");
        transition
    }

    /// Handles everything queued so far and returns how many events ran.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::warn!("input event queue disconnected");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        handled
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

/// Text for the startup dialog.
pub fn startup_summary(config: &ViewportConfig, settings_path: &Path, initial_offset: Point) -> String {
    let levels = config
        .zoom_levels
        .iter()
        .map(|z| format!("{z}x"))
        .collect::<Vec<_>>()
        .join("-");
    format!(
        "Magnifier+ Initialized\n\n\
         Configuration File:\n{}\n\n\
         Current Settings:\n\
         - Window Size: {}x{} pixels\n\
         - Window Shape: {}\n\
         - Tracking Mode: {}\n\
         - Zoom Area Size: {} pixels\n\
         - Initial Adjustment: ({}, {})\n\
         - Manual Offsets: {}H, {}V steps\n\
         - Move Step Size: {} pixels\n\
         - Refresh Rate: {} FPS\n\n\
         Controls:\n\
         1. Right-click + Scroll: Zoom ({})\n\
         2. Right-click + Arrows: Move view\n\
         3. Right-click tray icon: Exit",
        settings_path.display(),
        config.window_width,
        config.window_height,
        if config.circular { "Circle" } else { "Square" },
        if config.pointer_tracking {
            "Mouse"
        } else {
            "Screen Center"
        },
        config.zoom_area_size,
        initial_offset.x,
        initial_offset.y,
        config.horizontal_adjustment,
        config.vertical_adjustment,
        config.move_step,
        config.refresh_rate,
        levels,
    )
}

#[cfg(windows)]
pub use platform::run;

#[cfg(not(windows))]
pub fn run(_settings: crate::settings::Settings, _settings_path: &Path) -> anyhow::Result<()> {
    anyhow::bail!("the magnifier requires Windows")
}

#[cfg(windows)]
mod platform {
    use super::{startup_summary, EventPump};
    use crate::magnifier::config::ViewportConfig;
    use crate::magnifier::event::ViewportEvent;
    use crate::magnifier::input::{DefaultHookBackend, InputInterceptor, InterceptOptions};
    use crate::magnifier::refresh::{RefreshScheduler, ThreadTimer};
    use crate::magnifier::state::ViewportController;
    use crate::magnifier::surface::MagnifierWindow;
    use crate::settings::Settings;
    use crate::win_util::{
        primary_screen, show_info, InstanceGuard, MagnificationRuntime, WM_APP_DISPLAY_CHANGED,
        WM_APP_INPUT,
    };
    use anyhow::Result;
    use std::path::Path;
    use std::sync::mpsc;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, TranslateMessage, MSG, WM_TIMER,
    };

    const INSTANCE_NAME: &str = "MagnifierPlusInstance";

    /// Runs the magnifier until the tray icon requests exit.
    ///
    /// Guards are declared in acquisition order so that an early `?` or a
    /// normal exit releases them in reverse: timer, window, hooks,
    /// magnification runtime, instance mutex.
    pub fn run(settings: Settings, settings_path: &Path) -> Result<()> {
        let Some(_instance) = InstanceGuard::acquire(INSTANCE_NAME)? else {
            tracing::info!("another instance is already running");
            show_info(
                "Magnifier+ Already Running",
                "Magnifier+ is already running.\n\n\
                 Only one instance of the application can run at a time.\n\
                 Check your system tray for the running instance.",
            );
            return Ok(());
        };

        let config = ViewportConfig::from_settings(&settings);
        let screen = primary_screen();

        let _magnification = MagnificationRuntime::initialize()?;

        let (event_tx, event_rx) = mpsc::channel();
        let ui_thread = unsafe { GetCurrentThreadId() };
        let mut interceptor = InputInterceptor::new(Box::new(DefaultHookBackend::new(ui_thread)));
        interceptor.activate(
            event_tx,
            InterceptOptions {
                pointer_tracking: config.pointer_tracking,
            },
        )?;

        let window = MagnifierWindow::create(&config, screen)?;
        let controller = ViewportController::new(config.clone(), screen, window);
        if settings.show_startup_info {
            show_info(
                "Magnifier+ Ready",
                &startup_summary(&config, settings_path, controller.state().offset),
            );
        }
        let mut pump = EventPump::new(controller, event_rx);

        let mut scheduler = RefreshScheduler::new(config.refresh_rate, Box::new(ThreadTimer::default()));
        scheduler.start()?;

        tracing::info!(
            screen_width = screen.width,
            screen_height = screen.height,
            interval_ms = scheduler.interval().as_millis() as u64,
            "magnifier running"
        );
        let exit_code = message_loop(&mut pump);
        tracing::info!(exit_code, "message loop finished");

        scheduler.stop();
        interceptor.deactivate();
        Ok(())
    }

    fn message_loop(pump: &mut EventPump<MagnifierWindow>) -> i32 {
        let mut msg = MSG::default();
        loop {
            let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            if r.0 == 0 {
                return msg.wParam.0 as i32;
            }
            if r.0 == -1 {
                tracing::error!(error = %windows::core::Error::from_win32(), "GetMessageW failed");
                return -1;
            }

            if msg.hwnd.0.is_null() {
                match msg.message {
                    WM_APP_INPUT => {
                        pump.drain();
                        continue;
                    }
                    WM_TIMER => {
                        // Input queued before the tick is handled first.
                        pump.drain();
                        pump.dispatch(ViewportEvent::TimerTick);
                        continue;
                    }
                    WM_APP_DISPLAY_CHANGED => {
                        pump.dispatch(ViewportEvent::ScreenChanged(primary_screen()));
                        continue;
                    }
                    _ => {}
                }
            }

            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magnifier::surface::RecordingSurface;
    use crate::magnifier::geometry::ScreenMetrics;
    use std::sync::mpsc::channel;

    #[test]
    fn drain_handles_queued_events_in_order() {
        let (tx, rx) = channel();
        let controller = ViewportController::new(
            ViewportConfig::default(),
            ScreenMetrics::new(1920, 1080),
            RecordingSurface::default(),
        );
        let mut pump = EventPump::new(controller, rx);

        tx.send(ViewportEvent::PointerDown(Point::default())).unwrap();
        tx.send(ViewportEvent::Wheel(120)).unwrap();
        tx.send(ViewportEvent::Wheel(120)).unwrap();
        assert_eq!(pump.drain(), 3);
        assert_eq!(pump.controller().state().zoom_index, 2);
        assert_eq!(pump.drain(), 0);
    }

    #[test]
    fn drain_notices_disconnect() {
        let (tx, rx) = channel();
        let controller = ViewportController::new(
            ViewportConfig::default(),
            ScreenMetrics::new(800, 600),
            RecordingSurface::default(),
        );
        let mut pump = EventPump::new(controller, rx);
        tx.send(ViewportEvent::PointerUp).unwrap();
        drop(tx);
        assert_eq!(pump.drain(), 1);
        assert!(pump.is_disconnected());
    }

    #[test]
    fn summary_lists_settings_and_controls() {
        let config = ViewportConfig::default();
        let text = startup_summary(&config, Path::new("C:/mag/magnifier_settings.json"), Point::new(-35, -35));
        assert!(text.contains("C:/mag/magnifier_settings.json"));
        assert!(text.contains("Window Size: 300x300 pixels"));
        assert!(text.contains("Window Shape: Square"));
        assert!(text.contains("Tracking Mode: Screen Center"));
        assert!(text.contains("Initial Adjustment: (-35, -35)"));
        assert!(text.contains("Manual Offsets: 13H, 13V steps"));
        assert!(text.contains("Refresh Rate: 60 FPS"));
        assert!(text.contains("1.25x-2x-3x-4x-5x"));
    }
}
