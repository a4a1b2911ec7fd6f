#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use magnifier_plus::settings::{resolve_settings_path, Settings};
use magnifier_plus::{logging, magnifier, win_util};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Settings can fail before logging is configured; this is a
            // no-op when a subscriber is already installed.
            logging::init(false, None);
            tracing::error!(error = ?err, "magnifier failed");
            win_util::show_error("Magnifier+ Error", &format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let settings_path = resolve_settings_path()?;
    let settings = Settings::load_or_create(&settings_path)?;
    logging::init(settings.debug_logging, settings.log_file_path());
    tracing::info!(path = %settings_path.display(), "settings loaded");
    magnifier::run(settings, &settings_path)
}
