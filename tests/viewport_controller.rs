use magnifier_plus::magnifier::geometry::{Point, Rect, ScreenMetrics, Transform};
use magnifier_plus::magnifier::{
    EventPump, InputInterceptor, InterceptOptions, ManualTickSource, MockHookBackend,
    MockHookHandle, MouseMessage, RecordingSurface, RefreshScheduler, SurfaceCall, Transition,
    ViewportConfig, ViewportController, ViewportEvent, ZoomState,
};
use std::sync::mpsc::channel;
use std::time::Duration;

const SCREEN: ScreenMetrics = ScreenMetrics::new(1920, 1080);
const VK_LEFT: u32 = 0x25;
const VK_RIGHT: u32 = 0x27;

fn wheel(delta: i16) -> u32 {
    (delta as u16 as u32) << 16
}

struct Harness {
    pump: EventPump<RecordingSurface>,
    hooks: MockHookHandle,
    _interceptor: InputInterceptor,
}

fn harness(pointer_tracking: bool) -> Harness {
    let config = ViewportConfig {
        pointer_tracking,
        ..ViewportConfig::default()
    };
    let (backend, hooks) = MockHookBackend::new();
    let mut interceptor = InputInterceptor::new(Box::new(backend));
    let (tx, rx) = channel();
    interceptor
        .activate(tx, InterceptOptions { pointer_tracking })
        .unwrap();
    let controller = ViewportController::new(config, SCREEN, RecordingSurface::default());
    Harness {
        pump: EventPump::new(controller, rx),
        hooks,
        _interceptor: interceptor,
    }
}

#[test]
fn tracking_zoom_follows_pointer() {
    let mut h = harness(true);
    h.hooks.mouse(MouseMessage::RightDown, Point::new(100, 100), 0);
    assert!(h.hooks.mouse(MouseMessage::Wheel, Point::new(100, 100), wheel(120)));
    h.pump.drain();
    assert_eq!(h.pump.controller().zoom_state(), ZoomState::Active(1));

    h.pump.controller_mut().surface_mut().take_calls();
    assert!(h.hooks.mouse(MouseMessage::Wheel, Point::new(100, 100), wheel(120)));
    assert_eq!(h.pump.drain(), 1);

    // 2x over a 100px area is 50px wide; the (-35, -35) offset halves to -17.
    assert_eq!(
        h.pump.controller().surface().calls(),
        &[
            SurfaceCall::SetTransform(Transform::for_zoom(2.0)),
            SurfaceCall::SetSource(Rect::new(58, 58, 108, 108)),
            SurfaceCall::Show,
            SurfaceCall::MoveTo(Point::new(-50, -50)),
        ]
    );
}

#[test]
fn tracking_moves_window_with_pointer() {
    let mut h = harness(true);
    h.hooks.mouse(MouseMessage::RightDown, Point::new(100, 100), 0);
    h.hooks.mouse(MouseMessage::Wheel, Point::new(100, 100), wheel(120));
    h.hooks.mouse(MouseMessage::Move, Point::new(400, 300), 0);
    h.pump.drain();

    let surface = h.pump.controller().surface();
    assert!(surface
        .calls()
        .contains(&SurfaceCall::MoveTo(Point::new(250, 150))));
    let rect = surface.last_source().unwrap();
    assert_eq!(rect.width(), 80);
    assert_eq!(rect.center(), Point::new(400 - 28, 300 - 28));
}

#[test]
fn static_mode_passes_wheel_through() {
    let mut h = harness(false);
    h.hooks.mouse(MouseMessage::RightDown, Point::new(10, 10), 0);
    assert!(!h.hooks.mouse(MouseMessage::Wheel, Point::new(10, 10), wheel(120)));
    // Moves are not forwarded at all without tracking.
    h.hooks.mouse(MouseMessage::Move, Point::new(500, 500), 0);
    assert_eq!(h.pump.drain(), 2);
    assert_eq!(h.pump.controller().zoom_state(), ZoomState::Active(1));
    assert!(!h
        .pump
        .controller()
        .surface()
        .calls()
        .iter()
        .any(|call| matches!(call, SurfaceCall::MoveTo(_))));
}

#[test]
fn arrows_only_pan_while_button_held() {
    let mut h = harness(false);
    h.hooks.key_down(VK_LEFT);
    assert_eq!(h.pump.drain(), 0);
    let start = h.pump.controller().state().offset;

    h.hooks.mouse(MouseMessage::RightDown, Point::new(0, 0), 0);
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(120));
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(120));
    h.hooks.key_down(VK_RIGHT);
    h.pump.drain();

    let state = h.pump.controller().state();
    assert_eq!(state.offset, Point::new(start.x + 5, start.y));
    // Offset (-30, -35) at 2x shifts the screen center by (-15, -17).
    assert_eq!(
        h.pump.controller().surface().last_source(),
        Some(Rect::new(920, 498, 970, 548))
    );
}

#[test]
fn release_hides_and_keeps_level() {
    let mut h = harness(false);
    h.hooks.mouse(MouseMessage::RightDown, Point::new(0, 0), 0);
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(120));
    h.hooks.mouse(MouseMessage::RightUp, Point::new(0, 0), 0);
    h.pump.drain();
    assert!(!h.pump.controller().surface().is_visible());
    assert_eq!(h.pump.controller().zoom_state(), ZoomState::Inactive);

    // Pressing again resumes at the remembered level.
    h.hooks.mouse(MouseMessage::RightDown, Point::new(0, 0), 0);
    h.pump.drain();
    assert!(h.pump.controller().surface().is_visible());
    assert_eq!(h.pump.controller().zoom_state(), ZoomState::Active(1));
}

#[test]
fn wheel_down_to_zero_hides() {
    let mut h = harness(false);
    h.hooks.mouse(MouseMessage::RightDown, Point::new(0, 0), 0);
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(120));
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(-120));
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(-120));
    h.pump.drain();
    assert_eq!(h.pump.controller().state().zoom_index, 0);
    assert!(!h.pump.controller().surface().is_visible());
}

#[test]
fn refused_hooks_surface_as_error() {
    let (backend, hooks) = MockHookBackend::new();
    hooks.refuse_install();
    let mut interceptor = InputInterceptor::new(Box::new(backend));
    let (tx, _rx) = channel();
    let err = interceptor
        .activate(tx, InterceptOptions::default())
        .unwrap_err();
    assert!(format!("{err:#}").contains("failed to set input hooks"));
    assert!(!interceptor.is_active());
}

#[test]
fn dropping_interceptor_uninstalls_hooks() {
    let (backend, hooks) = MockHookBackend::new();
    {
        let mut interceptor = InputInterceptor::new(Box::new(backend));
        let (tx, _rx) = channel();
        interceptor.activate(tx, InterceptOptions::default()).unwrap();
        assert_eq!(hooks.install_count(), 1);
    }
    assert_eq!(hooks.uninstall_count(), 1);
}

#[test]
fn tracking_without_offset_centers_on_pointer() {
    // 20 steps of 5px cancel the -100 base offset of a 300px window.
    let config = ViewportConfig {
        pointer_tracking: true,
        horizontal_adjustment: 20,
        vertical_adjustment: 20,
        ..ViewportConfig::default()
    };
    let mut controller = ViewportController::new(config, SCREEN, RecordingSurface::default());
    assert_eq!(controller.state().offset, Point::new(0, 0));

    controller.handle(ViewportEvent::PointerDown(Point::new(100, 100)));
    controller.handle(ViewportEvent::Wheel(120));
    controller.handle(ViewportEvent::Wheel(120));

    let rect = controller.surface().last_source().unwrap();
    assert_eq!(rect, Rect::new(75, 75, 125, 125));
    assert_eq!(rect.center(), Point::new(100, 100));
}

#[test]
fn timer_ticks_only_refresh_while_displaying() {
    let source = ManualTickSource::default();
    let mut scheduler = RefreshScheduler::new(60, Box::new(source.clone()));
    scheduler.start().unwrap();
    assert_eq!(source.last_interval(), Duration::from_millis(16));

    let mut h = harness(false);
    assert_eq!(h.pump.dispatch(ViewportEvent::TimerTick), Transition::Ignored);

    h.hooks.mouse(MouseMessage::RightDown, Point::new(0, 0), 0);
    h.hooks.mouse(MouseMessage::Wheel, Point::new(0, 0), wheel(120));
    h.pump.drain();
    let before = h.pump.controller().surface().last_source();
    assert_eq!(h.pump.dispatch(ViewportEvent::TimerTick), Transition::Refreshed);
    assert_eq!(h.pump.controller().surface().last_source(), before);

    drop(scheduler);
    assert!(!source.is_running());
}
