//! Platform-specific paths for session files.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/patchbay/` (Linux), `~/Library/Application Support/patchbay/` (macOS), `%APPDATA%\patchbay\` (Windows)
//! - **Sessions**: `<user config>/sessions/`
//! - **Default session**: `<user config>/session.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use patchbay_config::paths;
//!
//! if let Some(path) = paths::find_session("living_room") {
//!     println!("Found session at: {:?}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "patchbay";

/// Subdirectory name for saved sessions.
const SESSIONS_SUBDIR: &str = "sessions";

/// File name of the default session.
const DEFAULT_SESSION_FILE: &str = "session.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the directory holding named sessions.
pub fn user_sessions_dir() -> PathBuf {
    user_config_dir().join(SESSIONS_SUBDIR)
}

/// Path of the session loaded when none is named.
pub fn default_session_path() -> PathBuf {
    user_config_dir().join(DEFAULT_SESSION_FILE)
}

/// Find a session file by name.
///
/// The name can be a path to an existing file, or a session name (with or
/// without `.toml`) looked up in [`user_sessions_dir`].
pub fn find_session(name: &str) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    find_session_in(&user_sessions_dir(), name)
}

/// Look up a session name inside `dir`.
pub fn find_session_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let filename = if name.ends_with(".toml") {
        name.to_string()
    } else {
        format!("{}.toml", name)
    };
    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// Ensure the user config directory exists.
pub fn ensure_user_config_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_config_dir())
}

/// Ensure the sessions directory exists.
pub fn ensure_user_sessions_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(user_sessions_dir())
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

/// List `.toml` files in `dir`, sorted by name.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_sessions_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut sessions: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    sessions.sort();
    sessions
}

/// List saved sessions in [`user_sessions_dir`].
pub fn list_user_sessions() -> Vec<PathBuf> {
    list_sessions_in(&user_sessions_dir())
}

/// Session name from a file path (the file stem).
///
/// ```rust
/// use patchbay_config::paths::session_name_from_path;
/// use std::path::Path;
///
/// let name = session_name_from_path(Path::new("/path/to/living_room.toml"));
/// assert_eq!(name, Some("living_room".to_string()));
/// ```
pub fn session_name_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn paths_end_with_app_name() {
        assert!(user_config_dir().ends_with(APP_NAME));
        assert!(user_sessions_dir().ends_with(Path::new(APP_NAME).join(SESSIONS_SUBDIR)));
        assert_eq!(
            default_session_path().file_name().and_then(|s| s.to_str()),
            Some(DEFAULT_SESSION_FILE)
        );
    }

    #[test]
    fn find_and_list_in_dir() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.toml"), "").unwrap();
        fs::write(temp.path().join("a.toml"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let listed = list_sessions_in(temp.path());
        let names: Vec<_> = listed
            .iter()
            .filter_map(|p| session_name_from_path(p.as_path()))
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(find_session_in(temp.path(), "a").is_some());
        assert!(find_session_in(temp.path(), "b.toml").is_some());
        assert!(find_session_in(temp.path(), "notes").is_none());
    }

    #[test]
    fn missing_dir_lists_nothing() {
        assert!(list_sessions_in(Path::new("/nonexistent/patchbay/sessions")).is_empty());
    }
}
