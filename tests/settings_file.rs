use magnifier_plus::magnifier::ViewportConfig;
use magnifier_plus::settings::{settings_path_from_exe_path, Settings, SETTINGS_FILE_NAME};
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

#[test]
#[serial]
fn load_or_create_writes_defaults_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);

    let created = Settings::load_or_create(&path).unwrap();
    assert_eq!(created, Settings::default());
    assert!(path.exists());

    let mut edited = created.clone();
    edited.window.width = 400;
    edited.save(&path).unwrap();

    let reloaded = Settings::load_or_create(&path).unwrap();
    assert_eq!(reloaded.window.width, 400);
}

#[test]
#[serial]
fn partial_file_keeps_remaining_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(
        &path,
        r#"{ "window": { "circular": 1 }, "tracking": { "mouse": true }, "zoom": { "levels": [2.0, 4.0] } }"#,
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert!(settings.window.circular);
    assert!(settings.tracking.mouse);
    assert_eq!(settings.window.width, 300);
    assert_eq!(settings.movement.step_size, 5);

    let config = ViewportConfig::from_settings(&settings);
    assert_eq!(config.zoom_levels, vec![2.0, 4.0]);
    assert!(config.pointer_tracking);
    assert!(config.circular);
}

#[test]
#[serial]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::write(&path, "{ window: ").unwrap();

    let err = Settings::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains(SETTINGS_FILE_NAME));
}

#[test]
fn settings_live_next_to_the_executable() {
    let dir = tempdir().unwrap();
    let exe = dir.path().join("magnifier_plus.exe");
    assert_eq!(
        settings_path_from_exe_path(&exe).unwrap(),
        dir.path().join(SETTINGS_FILE_NAME)
    );
}

#[test]
#[serial]
fn unreadable_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);
    fs::create_dir(&path).unwrap();

    let err = Settings::load_or_create(&path).unwrap_err();
    assert!(format!("{err:#}").contains("read settings file"));
}

#[test]
#[serial]
fn missing_file_loads_defaults_without_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE_NAME);

    assert_eq!(Settings::load(&path).unwrap(), Settings::default());
    assert!(!path.exists());
}
