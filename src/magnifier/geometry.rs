//! Pure coordinate math for the magnifier: initial offsets, per-level source
//! rectangles and the scale transform handed to the overlay surface.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Screen-space rectangle in the `left, top, right, bottom` convention used
/// by the platform magnification API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Midpoint using integer division, matching how the rect was built.
    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    pub width: i32,
    pub height: i32,
}

impl ScreenMetrics {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }
}

/// Diagonal scale matrix applied to the magnified content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Transform {
    pub fn for_zoom(zoom: f32) -> Self {
        Self {
            scale_x: zoom,
            scale_y: zoom,
        }
    }

    /// Row-major 3x3 matrix.
    pub fn matrix(&self) -> [f32; 9] {
        [
            self.scale_x,
            0.0,
            0.0,
            0.0,
            self.scale_y,
            0.0,
            0.0,
            0.0,
            1.0,
        ]
    }
}

/// Maps a window size to the base offset that lines the reticle up with the
/// pointer hotspot before any manual adjustment is applied.
pub trait OffsetCalibration {
    fn base_offset(&self, window_width: i32, window_height: i32) -> Point;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationAnchor {
    pub window_size: i32,
    pub offset: i32,
}

/// Straight line through two measured `(window size, offset)` anchors.
///
/// The stock anchors are 300px -> -100 and 600px -> -250. Two points do not
/// prove the relationship is linear; sizes outside the anchors are a
/// best-effort extrapolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCalibration {
    pub low: CalibrationAnchor,
    pub high: CalibrationAnchor,
}

impl Default for AnchorCalibration {
    fn default() -> Self {
        Self {
            low: CalibrationAnchor {
                window_size: 300,
                offset: -100,
            },
            high: CalibrationAnchor {
                window_size: 600,
                offset: -250,
            },
        }
    }
}

impl AnchorCalibration {
    fn axis(&self, size: i32) -> i32 {
        let span = self.high.window_size - self.low.window_size;
        if span == 0 {
            return self.low.offset;
        }
        let slope = (self.high.offset - self.low.offset) as f32 / span as f32;
        (self.low.offset as f32 + (size - self.low.window_size) as f32 * slope) as i32
    }
}

impl OffsetCalibration for AnchorCalibration {
    /// Each axis follows its own window dimension: x from the width, y from
    /// the height. Non-square windows therefore get different x and y
    /// offsets instead of both tracking the width.
    fn base_offset(&self, window_width: i32, window_height: i32) -> Point {
        Point::new(self.axis(window_width), self.axis(window_height))
    }
}

/// Offset proportional to the window size, `reference_offset * size / reference_size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalCalibration {
    pub reference_size: i32,
    pub reference_offset: i32,
}

impl Default for ProportionalCalibration {
    fn default() -> Self {
        Self {
            reference_size: 300,
            reference_offset: -100,
        }
    }
}

impl OffsetCalibration for ProportionalCalibration {
    fn base_offset(&self, window_width: i32, window_height: i32) -> Point {
        let axis = |size: i32| {
            if self.reference_size == 0 {
                return self.reference_offset;
            }
            let scale = size as f32 / self.reference_size as f32;
            (self.reference_offset as f32 * scale) as i32
        };
        Point::new(axis(window_width), axis(window_height))
    }
}

/// Base offset for the window plus the configured manual adjustment steps.
pub fn initial_offset(
    calibration: &dyn OffsetCalibration,
    window: (i32, i32),
    adjustment_steps: (i32, i32),
    move_step: i32,
) -> Point {
    let base = calibration.base_offset(window.0, window.1);
    Point::new(
        base.x + adjustment_steps.0 * move_step,
        base.y + adjustment_steps.1 * move_step,
    )
}

/// Size of the captured region at `zoom`, corrected for non-square windows.
///
/// Returns `(width, height)`; never negative.
pub fn scaled_extent(zoom_area_size: i32, zoom: f32, window: (i32, i32)) -> (i32, i32) {
    let size = ((zoom_area_size as f32 / zoom) as i32).max(0);
    let (w, h) = window;
    if w == h || w <= 0 || h <= 0 {
        return (size, size);
    }
    let ratio = w.min(h) as f32 / w.max(h) as f32;
    let long = (size as f32 / ratio) as i32;
    if w > h {
        (long, size)
    } else {
        (size, long)
    }
}

/// Offset in unmagnified pixels converted to the displacement at `zoom`,
/// truncated toward zero.
pub fn zoomed_displacement(offset: Point, zoom: f32) -> Point {
    Point::new(
        (offset.x as f32 / zoom) as i32,
        (offset.y as f32 / zoom) as i32,
    )
}

pub fn source_rect(
    zoom_area_size: i32,
    zoom: f32,
    window: (i32, i32),
    center: Point,
    offset: Point,
) -> Rect {
    let (width, height) = scaled_extent(zoom_area_size, zoom, window);
    let shift = zoomed_displacement(offset, zoom);
    let (half_w, half_h) = (width / 2, height / 2);
    Rect::new(
        center.x - half_w + shift.x,
        center.y - half_h + shift.y,
        center.x + half_w + shift.x,
        center.y + half_h + shift.y,
    )
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryInput<'a> {
    pub zoom_area_size: i32,
    pub window: (i32, i32),
    pub zoom_levels: &'a [f32],
    pub center: Point,
    pub offset: Point,
}

/// One source rectangle per zoom level. Slot `i` belongs to zoom index `i + 1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRectTable {
    rects: Vec<Rect>,
}

impl SourceRectTable {
    pub fn computed(input: &GeometryInput<'_>) -> Self {
        let mut table = Self::default();
        table.recompute(input);
        table
    }

    /// Rebuilds every level so a zoom change never waits on geometry.
    pub fn recompute(&mut self, input: &GeometryInput<'_>) {
        self.rects.clear();
        self.rects.extend(input.zoom_levels.iter().map(|&zoom| {
            source_rect(
                input.zoom_area_size,
                zoom,
                input.window,
                input.center,
                input.offset,
            )
        }));
    }

    pub fn rect_for_index(&self, zoom_index: usize) -> Option<Rect> {
        zoom_index
            .checked_sub(1)
            .and_then(|slot| self.rects.get(slot))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }
}
