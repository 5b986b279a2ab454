use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use env_logger::Env;
use tempfile::NamedTempFile;

/// Install the process-wide logger used by both tools.
pub fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

/// Parse command-line arguments, reporting usage errors with exit status 1.
///
/// `--help` and `--version` still print and exit successfully.
///
/// # Errors
/// Returns the exit code the caller should terminate with.
pub fn parse_args<P: Parser>() -> Result<P, ExitCode> {
    parse_args_from(std::env::args_os())
}

fn parse_args_from<P, I, T>(args: I) -> Result<P, ExitCode>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match P::try_parse_from(args) {
        Ok(parsed) => Ok(parsed),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // Nothing more to report if stderr itself is gone.
            err.print().ok();
            Err(ExitCode::FAILURE)
        }
    }
}

/// Replace `path` with `contents`, going through a temporary file in the same directory.
///
/// # Errors
/// Fails if the destination directory is missing or the file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    write_atomic_with(path, |file| file.write_all(contents))
}

/// Like [`write_atomic`], but lets an encoder stream directly into the temporary file.
///
/// # Errors
/// Propagates errors from `write` as well as temp-file creation and the final rename.
pub fn write_atomic_with<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;

    // Temp files are created owner-only; keep whatever the file had before.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }

    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
