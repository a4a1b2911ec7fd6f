use crate::settings::{default_zoom_levels, Settings};
use std::time::Duration;

/// Validated, immutable view of the settings the viewport runs on.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub window_width: i32,
    pub window_height: i32,
    pub zoom_area_size: i32,
    pub zoom_levels: Vec<f32>,
    pub refresh_rate: u32,
    pub move_step: i32,
    pub horizontal_adjustment: i32,
    pub vertical_adjustment: i32,
    pub circular: bool,
    pub pointer_tracking: bool,
    pub base_level_visible: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ViewportConfig {
    /// Out-of-range values are clamped rather than rejected; a bad value
    /// should give an odd-looking magnifier, not a failed start.
    pub fn from_settings(settings: &Settings) -> Self {
        let window_width = at_least_one("window.width", settings.window.width);
        let window_height = at_least_one("window.height", settings.window.height);
        let refresh_rate = if settings.performance.refresh_rate == 0 {
            tracing::warn!("performance.refresh_rate is 0; using 1 Hz");
            1
        } else {
            settings.performance.refresh_rate
        };
        if settings.zoom.area_size <= 0 {
            tracing::warn!(
                area_size = settings.zoom.area_size,
                "zoom.area_size is not positive; the magnified view will be empty"
            );
        }

        Self {
            window_width,
            window_height,
            zoom_area_size: settings.zoom.area_size,
            zoom_levels: sanitize_zoom_levels(&settings.zoom.levels),
            refresh_rate,
            move_step: settings.movement.step_size,
            horizontal_adjustment: settings.adjustments.horizontal,
            vertical_adjustment: settings.adjustments.vertical,
            circular: settings.window.circular,
            pointer_tracking: settings.tracking.mouse,
            base_level_visible: settings.zoom.base_level_visible,
        }
    }

    pub fn window(&self) -> (i32, i32) {
        (self.window_width, self.window_height)
    }

    pub fn min_index(&self) -> usize {
        if self.base_level_visible {
            1
        } else {
            0
        }
    }

    pub fn max_index(&self) -> usize {
        self.zoom_levels.len()
    }

    /// Factor for a zoom index; index 0 is "off" and has none.
    pub fn zoom_factor(&self, index: usize) -> Option<f32> {
        index
            .checked_sub(1)
            .and_then(|slot| self.zoom_levels.get(slot))
            .copied()
    }

    pub fn refresh_interval(&self) -> Duration {
        crate::magnifier::refresh::refresh_interval(self.refresh_rate)
    }
}

fn at_least_one(key: &str, value: i32) -> i32 {
    if value < 1 {
        tracing::warn!(key, value, "window dimension must be positive; using 1");
        1
    } else {
        value
    }
}

/// Keeps finite factors, raises anything below 1.0 to 1.0 and returns them
/// strictly increasing. Falls back to the defaults if nothing usable remains.
pub fn sanitize_zoom_levels(levels: &[f32]) -> Vec<f32> {
    let mut cleaned: Vec<f32> = levels
        .iter()
        .copied()
        .filter(|z| z.is_finite() && *z > 0.0)
        .map(|z| z.max(1.0))
        .collect();
    cleaned.sort_by(|a, b| a.total_cmp(b));
    cleaned.dedup();

    if cleaned.is_empty() {
        tracing::warn!("zoom.levels has no usable factors; using defaults");
        return default_zoom_levels();
    }
    if cleaned.as_slice() != levels {
        tracing::warn!(?levels, ?cleaned, "zoom.levels adjusted");
    }
    cleaned
}
