// src/system/control.rs

// The cooperative stop sentinel. Purely advisory: the external harness polls
// the same path and winds down on its own; nothing here touches the process.

use crate::constants::STOP_SENTINEL_FILENAME;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the stop sentinel with a human-readable timestamp payload.
/// Idempotent: repeated calls overwrite the timestamp.
pub fn request_graceful_stop(control_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(control_dir)?;
    let path = control_dir.join(STOP_SENTINEL_FILENAME);
    let payload = format!(
        "Stop requested at {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(&path, payload)?;
    Ok(path)
}

/// Removes the stop sentinel if present. Returns whether removal occurred.
pub fn cancel_graceful_stop(control_dir: &Path) -> std::io::Result<bool> {
    let path = control_dir.join(STOP_SENTINEL_FILENAME);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path)?;
    Ok(true)
}

/// Whether a stop sentinel is currently present.
pub fn stop_requested(control_dir: &Path) -> bool {
    control_dir.join(STOP_SENTINEL_FILENAME).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_then_cancel_leaves_no_sentinel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = dir.path().join("control");

        let path = request_graceful_stop(&control).expect("request should succeed");
        assert!(path.exists());
        assert!(stop_requested(&control));
        let payload = fs::read_to_string(&path).expect("read payload");
        assert!(payload.starts_with("Stop requested at "));

        assert!(cancel_graceful_stop(&control).expect("first cancel"));
        assert!(!stop_requested(&control));
        assert!(!cancel_graceful_stop(&control).expect("second cancel"));
    }

    #[test]
    fn repeated_requests_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = dir.path().join("control");
        request_graceful_stop(&control).expect("first request");
        request_graceful_stop(&control).expect("second request");
        assert!(stop_requested(&control));
    }
}
