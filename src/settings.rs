use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "magnifier_settings.json";

/// Settings file contents. Every section and key is optional; anything
/// missing falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub zoom: ZoomSettings,
    #[serde(default)]
    pub performance: PerformanceSettings,
    #[serde(default)]
    pub movement: MovementSettings,
    #[serde(default)]
    pub adjustments: AdjustmentSettings,
    #[serde(default)]
    pub tracking: TrackingSettings,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub debug_logging: bool,
    /// Optional file that receives log output instead of stdout.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Show the settings summary dialog on startup.
    #[serde(default = "default_true", deserialize_with = "flag::deserialize")]
    pub show_startup_info: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: i32,
    pub height: i32,
    #[serde(deserialize_with = "flag::deserialize")]
    pub circular: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            circular: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    /// Side of the unmagnified capture area in pixels.
    pub area_size: i32,
    /// Ascending magnification factors, one per wheel step.
    pub levels: Vec<f32>,
    /// When true the first factor is shown as soon as the right button is
    /// held; otherwise index 0 means "off".
    #[serde(deserialize_with = "flag::deserialize")]
    pub base_level_visible: bool,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            area_size: 100,
            levels: default_zoom_levels(),
            base_level_visible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    /// Overlay refresh frequency in Hz.
    pub refresh_rate: u32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self { refresh_rate: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Pixels per arrow key press.
    pub step_size: i32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self { step_size: 5 }
    }
}

/// Manual reticle adjustment, in move steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentSettings {
    pub horizontal: i32,
    pub vertical: i32,
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            horizontal: 13,
            vertical: 13,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrackingSettings {
    /// Follow the pointer instead of magnifying the screen center.
    #[serde(deserialize_with = "flag::deserialize")]
    pub mouse: bool,
}

pub fn default_zoom_levels() -> Vec<f32> {
    vec![1.25, 2.0, 3.0, 4.0, 5.0]
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            zoom: ZoomSettings::default(),
            performance: PerformanceSettings::default(),
            movement: MovementSettings::default(),
            adjustments: AdjustmentSettings::default(),
            tracking: TrackingSettings::default(),
            debug_logging: false,
            log_file: None,
            show_startup_info: true,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read settings file {}", path.display()))
            }
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("create settings parent folder {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))?;
        Ok(())
    }

    /// Loads `path`, writing the defaults out first when the file does not
    /// exist yet so there is something to edit.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let settings = Self::default();
        if let Err(err) = settings.save(path) {
            tracing::warn!(?err, path = %path.display(), "failed to write default settings");
        }
        Ok(settings)
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

/// Boolean keys accept `true`/`false` as well as the `0`/`1` integers older
/// configuration files used.
mod flag {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bool(bool),
        Int(i64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(value) => value,
            Repr::Int(value) => value != 0,
        })
    }
}
