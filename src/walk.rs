//! Depth-first directory tree walker.
//!
//! Similar in spirit to `fs::read_dir` composed recursively, but with the
//! policy the catalog needs: symbolic links are *always* treated as files,
//! even when they point at directories, and are never followed; a directory
//! that cannot be listed is simply not descended into.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// One visited directory: its path plus its immediate entries, split into
/// subdirectories and non-directory entries (name segments only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    pub path: PathBuf,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Lazy pre-order walk over the tree rooted at a given path, the root
/// included. Each call to [`Walk::new`] starts a fresh traversal.
pub struct Walk {
    stack: Vec<PathBuf>,
    fresh: bool,
}

impl Walk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            stack: vec![root.into()],
            fresh: true,
        }
    }
}

impl Iterator for Walk {
    type Item = DirListing;

    fn next(&mut self) -> Option<DirListing> {
        loop {
            let path = self.stack.pop()?;

            // The entry was classified when its parent was listed, but it may
            // have been replaced since. Re-check right before descending so a
            // directory swapped for a symlink is never followed. The starting
            // root is exempt, as the caller named it directly.
            if !std::mem::take(&mut self.fresh) && is_symlink_or_gone(&path) {
                continue;
            }

            if let Some(listing) = list_dir(&path) {
                // Reversed so the stack pops subdirectories in listing order.
                for dir in listing.dirs.iter().rev() {
                    self.stack.push(path.join(dir));
                }
                return Some(listing);
            }
        }
    }
}

fn is_symlink_or_gone(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(meta) => meta.file_type().is_symlink(),
        Err(_) => true,
    }
}

/// List one directory, classifying each entry without following symlinks.
/// Returns `None` when the directory cannot be listed at all; such a
/// directory is treated as having no visible children.
fn list_dir(path: &Path) -> Option<DirListing> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(?path, %err, "Skipping unreadable directory");
            return None;
        }
    };

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(?path, %err, "Directory listing failed mid-read");
                return None;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        // DirEntry::file_type does not follow symlinks, so a symlink to a
        // directory lands in `files`. A failed classification counts as
        // non-directory.
        let is_dir = entry
            .file_type()
            .map(|ft| ft.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }

    Some(DirListing {
        path: path.to_path_buf(),
        dirs,
        files,
    })
}
