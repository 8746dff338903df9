//! Logging for twinchat.
use anyhow::Context;
use std::io::LineWriter;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::OffsetTime;
use twinchat_core::get_data_dir;

const LOG_FILE: &str = "twinchat.log";
const MAX_LOG_BYTES: u64 = 100 * 1024;

/// Moves `<dir>/twinchat.log` to `twinchat.log.old` once it grows past 100KB.
fn rotate_log(data_dir: &Path) -> std::io::Result<()> {
    let log_path = data_dir.join(LOG_FILE);
    if log_path.exists() && std::fs::metadata(&log_path)?.len() > MAX_LOG_BYTES {
        let backup_path = data_dir.join(format!("{LOG_FILE}.old"));
        if backup_path.exists() {
            std::fs::remove_file(&backup_path)?;
        }
        std::fs::rename(&log_path, backup_path)?;
    }
    Ok(())
}

/// Initializes file based logging at `<data_dir>/twinchat.log`.
///
/// Both twinchat crates log at DEBUG and rustyline at INFO.
pub fn setup_logging() -> anyhow::Result<()> {
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    rotate_log(&data_dir).context("Failed to rotate log file")?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;

    // Flush after every line
    let writer = Mutex::new(LineWriter::new(log_file));

    tracing_subscriber::fmt()
        .with_env_filter("twinchat=debug,twinchat_core=debug,rustyline=info")
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(OffsetTime::local_rfc_3339()?)
        .init();
    Ok(())
}
