//! Global logger installation. Kept in its own binary because the
//! subscriber can be installed once per process.

use std::fs;

use bookhub::core::logging::{self, LOG_FILE_PREFIX};

#[test]
fn test_log_macros_reach_the_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let guard = logging::init(dir.path());

    // The subscriber already owns the `log` bridge.
    assert!(tracing_log::LogTracer::init().is_err());

    log::warn!("bridged from the log facade");
    tracing::warn!("emitted through tracing");
    drop(guard);

    let contents: String = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
        .map(|entry| fs::read_to_string(entry.path()).unwrap())
        .collect();

    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let messages: Vec<&str> = lines
        .iter()
        .filter_map(|line| line["fields"]["message"].as_str())
        .collect();
    assert!(messages.contains(&"bridged from the log facade"));
    assert!(messages.contains(&"emitted through tracing"));
}
