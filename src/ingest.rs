//! File entry ingestion for one cataloged directory.

use std::fs;
use std::os::unix::fs::MetadataExt;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{Directory, NewFile};
use crate::resolve::PathResolver;
use crate::store::CatalogStore;

/// Record every immediate non-directory entry of `dir` as a file row, in one
/// transaction.
///
/// Symlinks are identified but never followed: the row carries the raw link
/// target, size 0 and mtime 0, whether or not the target exists. Ordinary
/// files get size and mtime from a non-following stat. Callers normally skip
/// directories with `nfiles == 0`; invoking this on one is a harmless no-op.
pub fn ingest_files(
    store: &CatalogStore,
    resolver: &mut PathResolver,
    dir: &Directory,
) -> Result<()> {
    let path = resolver.full_path(store, dir)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(&path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Classification failure counts as non-directory, matching the
        // walker; the row is still recorded with whatever metadata is
        // readable.
        let file_type = entry.file_type();
        if file_type.as_ref().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }
        if file_type.map(|ft| ft.is_symlink()).unwrap_or(false) {
            let destination = fs::read_link(path.join(&name))?;
            files.push(NewFile::symlink(
                name,
                destination.to_string_lossy().into_owned(),
            ));
        } else {
            match fs::symlink_metadata(path.join(&name)) {
                Ok(meta) => {
                    files.push(NewFile::regular(name, meta.size() as i64, meta.mtime()));
                }
                Err(err) => {
                    warn!(?path, name, %err, "Skipping unreadable entry");
                }
            }
        }
    }

    debug!(?path, dir_id = dir.id, count = files.len(), "Ingesting files");
    store.add_files(dir.id, &files)?;
    Ok(())
}
