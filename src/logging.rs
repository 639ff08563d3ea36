// src/logging.rs
//
// Diagnostic output setup. Logs always go to stderr; with a log directory
// configured they additionally land in a timestamped file, with an
// `aquatap.log` symlink pointing at the current one (Unix only).

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise the tracing subscriber. Call once, before any worker activity.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<(), String> {
    let filter = if verbose {
        EnvFilter::new("aquatap=debug")
    } else {
        EnvFilter::new("aquatap=info")
    };

    match log_dir {
        Some(dir) => {
            let file = open_log_file(dir)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

/// Create a timestamped log file in the given directory and update the
/// `aquatap.log` symlink (Unix only — Windows symlinks require elevated
/// privileges).
fn open_log_file(dir: &Path) -> Result<File, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("Failed to create log dir: {}", e))?;

    let filename = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-aquatap.log")
        .to_string();
    let log_path = dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to create log file: {}", e))?;

    #[cfg(unix)]
    {
        let symlink_path = dir.join("aquatap.log");
        // Remove existing symlink/file if present
        let _ = std::fs::remove_file(&symlink_path);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &symlink_path) {
            eprintln!("Failed to create aquatap.log symlink: {}", e);
        }
    }

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();

        open_log_file(dir.path()).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.ends_with("-aquatap.log")));
        #[cfg(unix)]
        assert!(names.iter().any(|n| n == "aquatap.log"));
    }
}
