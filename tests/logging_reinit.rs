use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn fallback_init_keeps_configured_file_logger() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("magnifier.log");

    magnifier_plus::logging::init(false, Some(path.clone()));
    // A later init, as done when reporting a fatal error, must not replace it.
    magnifier_plus::logging::init(false, None);
    tracing::error!("magnifier failed");

    sleep(Duration::from_millis(100));

    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("magnifier failed"));
}
