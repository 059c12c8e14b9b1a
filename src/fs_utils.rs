//! Filesystem utility functions
//!
//! This module provides common filesystem operations used across the codebase.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

/// Recursively copy a directory's contents over a destination directory
///
/// Files are whole-file overwrites. Destination entries with no counterpart
/// in `src` are left alone unless `prune` is set, in which case they are
/// deleted so the destination mirrors the source exactly.
///
/// # Errors
/// Returns an error if:
/// - Source doesn't exist or is not a directory
/// - Destination cannot be created
/// - Any file or directory cannot be copied or pruned
pub fn copy_dir_recursive(src: &Path, dst: &Path, prune: bool) -> Result<()> {
    if !src.exists() {
        bail!("Source directory does not exist: {:?}", src);
    }

    if !src.is_dir() {
        bail!("Source is not a directory: {:?}", src);
    }

    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create destination directory: {:?}", dst))?;

    let mut seen: HashSet<OsString> = HashSet::new();
    for entry in
        fs::read_dir(src).with_context(|| format!("Failed to read source directory: {:?}", src))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        seen.insert(entry.file_name());

        if src_path.is_dir() {
            if dst_path.is_file() {
                fs::remove_file(&dst_path)?;
            }
            copy_dir_recursive(&src_path, &dst_path, prune)?;
        } else {
            if dst_path.is_dir() {
                fs::remove_dir_all(&dst_path)?;
            }
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!("Failed to copy file: {:?} -> {:?}", src_path, dst_path)
            })?;
        }
    }

    if prune {
        for entry in fs::read_dir(dst)? {
            let entry = entry?;
            if seen.contains(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            tracing::debug!(path = %path.display(), "pruning stale file");
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
    }

    Ok(())
}

/// Copy a single file, creating the destination's parent directories
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    fs::copy(src, dst).with_context(|| format!("Failed to copy file: {:?} -> {:?}", src, dst))?;
    Ok(())
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether a file was actually removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove file: {:?}", path)),
    }
}

/// Names of the immediate subdirectories of `dir`, sorted
///
/// A missing directory yields an empty list.
pub fn subdir_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.exists() {
        return Ok(names);
    }

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Last modification time of a path, if it exists
pub fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(modified.into())
}

/// Write a small file atomically: write to a temp sibling, then rename
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file: {:?}", temp_path))?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename file: {:?} -> {:?}", temp_path, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_overwrites_and_keeps_stale() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("main.yml"), "new").unwrap();
        fs::write(src.join("nested/extra.yml"), "x").unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("main.yml"), "old").unwrap();
        fs::write(dst.join("stale.yml"), "stale").unwrap();

        copy_dir_recursive(&src, &dst, false).unwrap();

        assert_eq!(fs::read_to_string(dst.join("main.yml")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dst.join("nested/extra.yml")).unwrap(), "x");
        assert!(dst.join("stale.yml").exists());
    }

    #[test]
    fn test_copy_dir_prune_removes_stale() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.yml"), "new").unwrap();
        fs::create_dir_all(dst.join("old_dir")).unwrap();
        fs::write(dst.join("stale.yml"), "stale").unwrap();

        copy_dir_recursive(&src, &dst, true).unwrap();

        assert!(dst.join("main.yml").exists());
        assert!(!dst.join("stale.yml").exists());
        assert!(!dst.join("old_dir").exists());
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = copy_dir_recursive(
            &temp_dir.path().join("nope"),
            &temp_dir.path().join("dst"),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_remove_file_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, "x").unwrap();
        assert!(remove_file_if_exists(&path).unwrap());
        assert!(!remove_file_if_exists(&path).unwrap());
    }

    #[test]
    fn test_subdir_names_skips_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("b")).unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("current_cluster"), "a").unwrap();

        assert_eq!(subdir_names(temp_dir.path()).unwrap(), vec!["a", "b"]);
        assert!(subdir_names(&temp_dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_write_atomic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("deep/pointer");
        write_atomic(&path, "prod\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "prod\n");
        assert!(!path.with_extension("tmp").exists());
    }
}
