use crate::magnifier::config::ViewportConfig;
use crate::magnifier::event::{Direction, ViewportEvent};
use crate::magnifier::geometry::{
    initial_offset, AnchorCalibration, GeometryInput, OffsetCalibration, Point, Rect,
    ScreenMetrics, SourceRectTable, Transform,
};
use crate::magnifier::surface::OverlaySurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomState {
    Inactive,
    Active(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    pub zoom_index: usize,
    /// Manual displacement in unmagnified screen pixels.
    pub offset: Point,
    pub pointer: Point,
    pub right_button_down: bool,
}

/// What a single event did to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Shown(usize),
    Hidden,
    Zoomed { from: usize, to: usize },
    Panned(Point),
    Tracked(Point),
    Refreshed,
    ScreenResized(ScreenMetrics),
}

/// Owns all mutable magnifier state and drives the overlay surface.
///
/// Events must be delivered serially; the controller assumes nothing else
/// touches the surface between calls.
pub struct ViewportController<S> {
    config: ViewportConfig,
    screen: ScreenMetrics,
    state: ViewportState,
    table: SourceRectTable,
    surface: S,
}

impl<S: OverlaySurface> ViewportController<S> {
    pub fn new(config: ViewportConfig, screen: ScreenMetrics, surface: S) -> Self {
        Self::with_calibration(config, screen, surface, &AnchorCalibration::default())
    }

    pub fn with_calibration(
        config: ViewportConfig,
        screen: ScreenMetrics,
        surface: S,
        calibration: &dyn OffsetCalibration,
    ) -> Self {
        let offset = initial_offset(
            calibration,
            config.window(),
            (config.horizontal_adjustment, config.vertical_adjustment),
            config.move_step,
        );
        let state = ViewportState {
            zoom_index: config.min_index(),
            offset,
            pointer: screen.center(),
            right_button_down: false,
        };
        let mut controller = Self {
            config,
            screen,
            state,
            table: SourceRectTable::default(),
            surface,
        };
        controller.recompute();
        tracing::debug!(?offset, zoom_index = state.zoom_index, "viewport initialised");
        controller
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn screen(&self) -> ScreenMetrics {
        self.screen
    }

    pub fn table(&self) -> &SourceRectTable {
        &self.table
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn zoom_state(&self) -> ZoomState {
        if self.state.right_button_down && self.is_level_visible() {
            ZoomState::Active(self.state.zoom_index)
        } else {
            ZoomState::Inactive
        }
    }

    /// Rectangle currently selected for display, if any.
    pub fn current_rect(&self) -> Option<Rect> {
        self.table.rect_for_index(self.state.zoom_index)
    }

    pub fn handle(&mut self, event: ViewportEvent) -> Transition {
        let transition = match event {
            ViewportEvent::PointerDown(pos) => self.on_pointer_down(pos),
            ViewportEvent::PointerUp => self.on_pointer_up(),
            ViewportEvent::Wheel(delta) => self.on_wheel(delta),
            ViewportEvent::KeyDown(direction) => self.on_key_down(direction),
            ViewportEvent::PointerMove(pos) => self.on_pointer_move(pos),
            ViewportEvent::TimerTick => self.on_timer_tick(),
            ViewportEvent::ScreenChanged(screen) => self.on_screen_changed(screen),
        };
        if !matches!(transition, Transition::Ignored | Transition::Refreshed) {
            tracing::debug!(?event, ?transition, "viewport transition");
        }
        transition
    }

    fn on_pointer_down(&mut self, pos: Point) -> Transition {
        self.state.right_button_down = true;
        if self.config.pointer_tracking {
            self.state.pointer = pos;
            self.recompute();
        }
        let Some(zoom) = self.config.zoom_factor(self.state.zoom_index) else {
            return Transition::Ignored;
        };
        // The starting level never went through a wheel step, so its scale
        // may not be on the surface yet.
        self.surface.set_transform(Transform::for_zoom(zoom));
        self.push_source();
        self.surface.show();
        self.reposition();
        Transition::Shown(self.state.zoom_index)
    }

    fn on_pointer_up(&mut self) -> Transition {
        self.state.right_button_down = false;
        self.surface.hide();
        Transition::Hidden
    }

    fn on_wheel(&mut self, delta: i16) -> Transition {
        if !self.state.right_button_down || delta == 0 {
            return Transition::Ignored;
        }
        let current = self.state.zoom_index;
        let next = if delta > 0 {
            (current + 1).min(self.config.max_index())
        } else {
            current
                .saturating_sub(1)
                .max(self.config.min_index())
        };
        self.apply_zoom_level(next)
    }

    fn on_key_down(&mut self, direction: Direction) -> Transition {
        if !self.state.right_button_down {
            return Transition::Ignored;
        }
        let delta = direction.delta(self.config.move_step);
        self.state.offset.x += delta.x;
        self.state.offset.y += delta.y;
        self.recompute();
        if self.is_level_visible() {
            self.push_source();
        }
        Transition::Panned(self.state.offset)
    }

    fn on_pointer_move(&mut self, pos: Point) -> Transition {
        if !self.config.pointer_tracking
            || !self.state.right_button_down
            || !self.is_level_visible()
        {
            return Transition::Ignored;
        }
        self.state.pointer = pos;
        self.recompute();
        self.reposition();
        self.push_source();
        Transition::Tracked(pos)
    }

    fn on_timer_tick(&mut self) -> Transition {
        if !self.state.right_button_down || !self.is_level_visible() {
            return Transition::Ignored;
        }
        self.push_source();
        Transition::Refreshed
    }

    fn on_screen_changed(&mut self, screen: ScreenMetrics) -> Transition {
        self.screen = screen;
        self.recompute();
        if !self.config.pointer_tracking {
            self.surface.move_to(centered_window(screen, self.config.window()));
        }
        if self.zoom_state() != ZoomState::Inactive {
            self.push_source();
        }
        Transition::ScreenResized(screen)
    }

    fn apply_zoom_level(&mut self, next: usize) -> Transition {
        let previous = self.state.zoom_index;
        if next == previous {
            return Transition::Ignored;
        }
        self.state.zoom_index = next;

        match self.config.zoom_factor(next) {
            Some(zoom) => {
                // Transform first: a fresh rect under a stale scale misregisters
                // the magnified content for a frame.
                self.surface.set_transform(Transform::for_zoom(zoom));
                self.recompute();
                self.push_source();
                self.surface.show();
                self.reposition();
            }
            None => self.surface.hide(),
        }
        Transition::Zoomed {
            from: previous,
            to: next,
        }
    }

    fn is_level_visible(&self) -> bool {
        self.config.zoom_factor(self.state.zoom_index).is_some()
    }

    fn center(&self) -> Point {
        if self.config.pointer_tracking {
            self.state.pointer
        } else {
            self.screen.center()
        }
    }

    fn recompute(&mut self) {
        let input = GeometryInput {
            zoom_area_size: self.config.zoom_area_size,
            window: self.config.window(),
            zoom_levels: &self.config.zoom_levels,
            center: self.center(),
            offset: self.state.offset,
        };
        self.table.recompute(&input);
    }

    fn push_source(&mut self) {
        if let Some(rect) = self.current_rect() {
            self.surface.set_source(rect);
        }
    }

    /// Centers the overlay window on the pointer in tracking mode.
    fn reposition(&mut self) {
        if !self.config.pointer_tracking {
            return;
        }
        let top_left = Point::new(
            self.state.pointer.x - self.config.window_width / 2,
            self.state.pointer.y - self.config.window_height / 2,
        );
        self.surface.move_to(top_left);
    }
}

/// Top-left corner that centers a `window`-sized overlay on `screen`.
pub fn centered_window(screen: ScreenMetrics, window: (i32, i32)) -> Point {
    Point::new((screen.width - window.0) / 2, (screen.height - window.1) / 2)
}
