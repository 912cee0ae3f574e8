//! Persistent client session identity
//!
//! The backend correlates all requests from one client through an opaque
//! session identifier. It is created lazily on first launch, persisted under
//! the platform data directory, and reused unchanged across runs. Nothing in
//! this crate ever mutates or deletes it.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tempfile::NamedTempFile;

use crate::core::constants::SESSION_ID_FILE;

/// Reads the stored session identifier, creating and persisting a fresh one
/// if none exists yet. Called once per app lifetime.
pub fn get_or_create_session_id() -> Result<String, Box<dyn Error>> {
    let path = session_id_path()?;
    get_or_create_at(&path)
}

fn session_id_path() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("org", "permacommons", "sidechat")
        .ok_or("could not determine data directory")?;
    Ok(proj_dirs.data_dir().join(SESSION_ID_FILE))
}

/// Path-parameterized variant so tests can run against a temp directory.
pub fn get_or_create_at(path: &Path) -> Result<String, Box<dyn Error>> {
    if path.exists() {
        let stored = fs::read_to_string(path)?;
        let stored = stored.trim();
        if !stored.is_empty() {
            return Ok(stored.to_string());
        }
    }

    let id = generate_session_id()?;
    write_atomic(path, &id)?;
    tracing::info!(path = %path.display(), "created new session identifier");
    Ok(id)
}

/// A random v4 UUID rendered in canonical form. 128 bits of randomness makes
/// collisions between clients negligible.
fn generate_session_id() -> Result<String, Box<dyn Error>> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes)?;
    bytes[6] = (bytes[6] & 0x0f) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // RFC 4122 variant
    Ok(format_uuid(&bytes))
}

fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Write through a temp file in the same directory so the stored identifier
/// is never observed half-written.
fn write_atomic(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp_file = NamedTempFile::new_in(parent)?;
    writeln!(temp_file, "{contents}")?;
    temp_file.flush()?;
    temp_file.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_identifier_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_ID_FILE);
        let id = get_or_create_at(&path).unwrap();
        assert!(!id.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn identifier_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_ID_FILE);
        let first = get_or_create_at(&path).unwrap();
        let second = get_or_create_at(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SESSION_ID_FILE);
        fs::write(&path, "\n").unwrap();
        let id = get_or_create_at(&path).unwrap();
        assert!(!id.is_empty());
    }

    #[test]
    fn generated_identifier_is_a_v4_uuid() {
        let id = generate_session_id().unwrap();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
        assert!(parts[2].starts_with('4'));
        assert!(matches!(
            parts[3].chars().next(),
            Some('8') | Some('9') | Some('a') | Some('b')
        ));
    }

    #[test]
    fn format_uuid_groups_bytes_canonically() {
        let id = format_uuid(&[0xAB; 16]);
        assert_eq!(id, "abababab-abab-abab-abab-abababababab");
    }
}
