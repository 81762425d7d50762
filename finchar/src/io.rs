//! Filesystem helpers that record the offending path on failure.

use std::path::Path;

use crate::error::{with_err_context, ErrorContext, Result};

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::create_dir_all(path), || {
        ErrorContext::CreateDir(path.to_path_buf())
    })
}

pub fn create_file(path: impl AsRef<Path>) -> Result<std::fs::File> {
    let path = path.as_ref();
    with_err_context(std::fs::File::create(path), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })
}

/// Writes `contents` to `path`, replacing whatever was there.
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    with_err_context(std::fs::write(path, contents), || {
        ErrorContext::CreateFile(path.to_path_buf())
    })
}

pub fn read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    with_err_context(std::fs::read(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })
}

pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    with_err_context(std::fs::read_to_string(path), || {
        ErrorContext::ReadFile(path.to_path_buf())
    })
}

/// Removes the output of an earlier run, so a failed simulation cannot be
/// mistaken for a successful one.
pub fn remove_stale(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            with_err_context(Err(e), || ErrorContext::RemoveFile(path.to_path_buf()))
        }
        _ => Ok(()),
    }
}
