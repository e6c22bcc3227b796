//! Platform-specific directory paths.

use std::path::PathBuf;

use directories::ProjectDirs;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "vldx";
const APPLICATION: &str = "vldx";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

/// Get the cache directory for logs.
///
/// - Linux: `$XDG_CACHE_HOME/vldx` or `~/.cache/vldx`
/// - macOS: `~/Library/Caches/dev.vldx.vldx`
/// - Windows: `C:\Users\<User>\AppData\Local\vldx\vldx\cache`
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the path to the latest log file.
pub fn log_file() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("latest.log"))
}

/// Create the cache directory if needed. Returns the log file path.
pub fn ensure_log_file() -> std::io::Result<PathBuf> {
    let path = log_file().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no home directory")
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(path)
}
