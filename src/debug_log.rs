//! Debug logging for carve sessions
//!
//! Writes to `carve_debug.log` in the working directory.
//! The log file is recreated on each `init_debug_log()` call. Until then
//! every call is a no-op, so the engine stays quiet under `cargo test`.

use std::fs::File;
use std::io::Write;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref DEBUG_LOG: Mutex<Option<File>> = Mutex::new(None);
}

/// Log a debug message to the carve debug log file
pub fn debug_log(msg: &str) {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }
    }
}

/// Initialize the debug log file (overwrites any existing log)
pub fn init_debug_log() {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        *guard = File::create("carve_debug.log").ok();
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "=== PIXY CARVE DEBUG LOG ===");
            let _ = writeln!(file, "Timestamp: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

/// Close the log file; later messages are dropped.
pub fn close_debug_log() {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        *guard = None;
    }
}

/// Format a patch footprint for log lines.
pub fn describe_rect(origin_x: i32, origin_z: i32, width: usize, depth: usize) -> String {
    format!(
        "[{}..{}) x [{}..{})",
        origin_x,
        i64::from(origin_x) + width as i64,
        origin_z,
        i64::from(origin_z) + depth as i64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_log_without_init_is_noop() {
        close_debug_log();
        debug_log("nothing should happen");
    }

    #[test]
    fn test_describe_rect() {
        assert_eq!(describe_rect(2, 3, 4, 1), "[2..6) x [3..4)");
        assert_eq!(
            describe_rect(i32::MAX, 0, 2, 1),
            "[2147483647..2147483649) x [0..1)"
        );
    }
}
