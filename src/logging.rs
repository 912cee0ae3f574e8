//! Transcript logging and tracing diagnostics
//!
//! Transcript logging (`-l/--log <file>`) appends the conversation as plain
//! text while the session runs. Tracing output goes to a file under the data
//! directory when `RUST_LOG` is set; a full-screen TUI owns stdout, so
//! diagnostics can never be printed there.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn Error>> {
        let logging = LoggingState {
            is_active: log_file.is_some(),
            file_path: log_file,
        };

        if let Some(path) = &logging.file_path {
            logging.test_file_access(path)?;
        }

        Ok(logging)
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Append one transcript entry, preserving its line structure, followed
    /// by a blank spacer line.
    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn Error>> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (Some(path), true) => format!(
                "logging to {}",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
            _ => String::new(),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

/// Install the tracing subscriber when `RUST_LOG` asks for output. Writes to
/// `sidechat.log` under the platform data directory.
pub fn init_tracing() -> Result<(), Box<dyn Error>> {
    if std::env::var("RUST_LOG").is_err() {
        return Ok(());
    }

    let proj_dirs = ProjectDirs::from("org", "permacommons", "sidechat")
        .ok_or("could not determine data directory")?;
    std::fs::create_dir_all(proj_dirs.data_dir())?;
    let log_path = proj_dirs.data_dir().join("sidechat.log");
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
