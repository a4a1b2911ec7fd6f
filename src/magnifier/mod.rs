mod app;
mod config;
mod event;
pub mod geometry;
mod input;
mod refresh;
mod state;
mod surface;

pub use app::{run, startup_summary, EventPump};
pub use config::{sanitize_zoom_levels, ViewportConfig};
pub use event::{Direction, ViewportEvent};
pub use input::{
    translate_key, translate_mouse, wheel_delta, DefaultHookBackend, HookBackend,
    InputInterceptor, InterceptOptions, MockHookBackend, MockHookHandle, MouseMessage,
    MouseVerdict,
};
pub use refresh::{refresh_interval, ManualTickSource, RefreshScheduler, TickSource};
pub use state::{Transition, ViewportController, ViewportState, ZoomState};
pub use surface::{OverlaySurface, RecordingSurface, SurfaceCall};

#[cfg(windows)]
pub use refresh::ThreadTimer;
#[cfg(windows)]
pub use surface::MagnifierWindow;
