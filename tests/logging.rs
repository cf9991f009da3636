use std::{fs, thread::sleep, time::Duration};

use serial_test::serial;
use tempfile::tempdir;

// Installing the global subscriber is one-shot per process, so this file
// holds a single test.
#[test]
#[serial]
fn writes_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.txt");

    chord_launcher::logging::init(true, Some(path.clone()));
    tracing::info!("test");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("test"));
}
