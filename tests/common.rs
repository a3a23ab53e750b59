//! Shared test utilities for integration tests.
//!
//! Provides helpers for writing markdown fixtures to temporary directories
//! and running the mdlinkattr binary on them.

#![allow(dead_code)]

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Creates temporary directory with given files.
///
/// # Arguments
///
/// * `files`: Pairs of relative path and file content
///
/// # Errors
///
/// Returns error if directory creation or file write fails
pub fn create_fixture(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for (path, content) in files {
        write_file(dir.path(), path, content)?;
    }
    Ok(dir)
}

/// Writes file, creating parent directories as needed.
///
/// # Errors
///
/// Returns error if directory creation or file write fails
pub fn write_file(root: &Path, path: &str, content: &str) -> Result<PathBuf> {
    let file_path = root.join(path);
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Runs the mdlinkattr binary with given arguments.
///
/// # Errors
///
/// Returns error if the binary cannot be started
pub fn run_binary(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_mdlinkattr"))
        .args(args)
        .output()?)
}
