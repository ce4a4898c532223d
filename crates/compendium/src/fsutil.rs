//! Directory copy and file discovery.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Copy `from` into `to` recursively, overwriting existing files. Returns the
/// number of files copied. Symlinks are not followed.
pub fn copy_dir(from: &Path, to: &Path) -> io::Result<u64> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copied += copy_dir(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// All files under `root` accepted by `keep`, sorted by path.
pub fn find_files(root: &Path, keep: &dyn Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect(root, keep, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect(dir: &Path, keep: &dyn Fn(&Path) -> bool, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect(&path, keep, found)?;
        } else if file_type.is_file() && keep(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Whether `inner` is `outer` or lies below it.
pub fn is_within(outer: &Path, inner: &Path) -> bool {
    match (outer.canonicalize(), absolute(inner)) {
        (Ok(outer), Some(inner)) => inner.starts_with(outer),
        _ => false,
    }
}

/// `path` made absolute, resolving symlinks in the part that exists.
fn absolute(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let base = match parent {
        Some(parent) => absolute(parent)?,
        None => std::env::current_dir().ok()?,
    };
    Some(base.join(path.file_name()?))
}
