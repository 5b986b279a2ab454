use std::env;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "updates.json";

/// Returns the directory holding the running executable.
///
/// Falls back to the current directory when the executable path cannot be resolved.
pub fn tool_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .map(|exe| exe.canonicalize().unwrap_or(exe))
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Manifest rewritten by `update-version` when no explicit path is given.
pub fn default_manifest_path() -> PathBuf {
    tool_dir().join(MANIFEST_FILE)
}

/// Project root used by `update-icons`: two levels above the tool directory.
pub fn default_project_root() -> PathBuf {
    project_root_from(&tool_dir())
}

fn project_root_from(tool_dir: &Path) -> PathBuf {
    tool_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| tool_dir.to_path_buf())
}
