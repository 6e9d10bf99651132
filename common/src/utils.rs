use std::io;
use std::path::Path;

pub fn generate_unique_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs > 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Returns whether `path` is a directory containing at least one entry.
/// Fails with the underlying io error if the directory cannot be read.
pub fn directory_has_entries(path: &Path) -> io::Result<bool> {
    let mut entries = std::fs::read_dir(path)?;
    Ok(entries.next().is_some())
}
