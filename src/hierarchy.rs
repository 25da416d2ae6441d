//! Directory hierarchy discovery and persistence.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Directory, FileSystem};
use crate::store::CatalogStore;
use crate::walk::Walk;

/// Catalog every physical directory under `fs`, seeding the synthetic root
/// with id `start_id`.
///
/// Returns the highest id allocated. When scanning several filesystems, pass
/// this value plus one as the next filesystem's `start_id` so id ranges chain
/// without collision.
pub fn build_hierarchy(store: &CatalogStore, fs: &FileSystem, start_id: i64) -> Result<i64> {
    store.add_root_directory(fs.id, start_id)?;
    let root = store.directory(start_id)?;
    resume_hierarchy(store, fs, &root, start_id)
}

/// Continue hierarchy discovery for a filesystem whose root row already
/// exists, allocating new ids upward from `last_id`.
///
/// This is also the resume path for a scan that was interrupted right after
/// seeding its root: discovery restarts from the filesystem's real path, the
/// root's entry count is rewritten from the fresh listing, and subdirectories
/// are inserted as they are found. If the earlier scan had in fact completed
/// (an empty root has exactly one row), the walk finds nothing new.
pub fn resume_hierarchy(
    store: &CatalogStore,
    fs: &FileSystem,
    root: &Directory,
    mut last_id: i64,
) -> Result<i64> {
    info!(filesystem = %fs.name, root_id = root.id, "Scanning directories");

    // Incremental path -> id map; children always resolve because a
    // directory is recorded while its parent's listing is processed, before
    // the walker descends into it.
    let mut parents: HashMap<PathBuf, i64> = HashMap::new();
    parents.insert(PathBuf::from(&fs.name), root.id);

    let mut visited = 0u64;
    for listing in Walk::new(&fs.name) {
        let &dir_id = parents
            .get(&listing.path)
            .ok_or_else(|| Error::UnmappedDirectory(listing.path.clone()))?;

        let mut children = Vec::with_capacity(listing.dirs.len());
        for name in &listing.dirs {
            last_id += 1;
            parents.insert(listing.path.join(name), last_id);
            children.push((last_id, name.clone()));
        }

        store.record_listing(fs.id, dir_id, listing.files.len() as i64, &children)?;
        visited += 1;
        debug!(?listing.path, dir_id, nfiles = listing.files.len(), "Recorded directory");
    }

    info!(filesystem = %fs.name, visited, last_id, "Directory scan complete");
    Ok(last_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store
    }

    #[test]
    fn one_row_per_visited_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("a/deep")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        File::create(root.join("a/x.txt")).unwrap();

        let store = store();
        let fs_row = store
            .add_filesystem(&root.to_string_lossy())
            .unwrap();
        let last_id = build_hierarchy(&store, &fs_row, 1).unwrap();

        assert_eq!(last_id, 4);
        assert_eq!(store.directory_count(fs_row.id).unwrap(), 4);

        let root_dir = store.directory(1).unwrap();
        assert!(root_dir.is_root());
        assert_eq!(root_dir.nfiles, 0);

        // Listing order from the OS is arbitrary, so find "a" by name.
        let a = store.directories_with_files(fs_row.id).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].name, "a");
        assert_eq!(a[0].parent_id, 1);
        assert_eq!(a[0].nfiles, 1);
    }

    #[test]
    fn ids_chain_across_filesystems() {
        let tmp1 = tempfile::tempdir().unwrap();
        let tmp2 = tempfile::tempdir().unwrap();
        fs::create_dir(tmp1.path().join("only")).unwrap();

        let store = store();
        let fs1 = store.add_filesystem(&tmp1.path().to_string_lossy()).unwrap();
        let fs2 = store.add_filesystem(&tmp2.path().to_string_lossy()).unwrap();

        let last = build_hierarchy(&store, &fs1, 1).unwrap();
        assert_eq!(last, 2);
        let last = build_hierarchy(&store, &fs2, last + 1).unwrap();
        assert_eq!(last, 3);

        let fs2_root = store.one_directory_for(fs2.id).unwrap();
        assert_eq!(fs2_root.id, 3);
        assert_eq!(fs2_root.parent_id, 3);
    }

    #[test]
    fn resume_picks_up_after_seeded_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        File::create(root.join("top.txt")).unwrap();

        let store = store();
        let fs_row = store.add_filesystem(&root.to_string_lossy()).unwrap();

        // Simulate a run that died right after seeding the root.
        store.add_root_directory(fs_row.id, 1).unwrap();

        let seeded = store.one_directory_for(fs_row.id).unwrap();
        let last_id = resume_hierarchy(&store, &fs_row, &seeded, store.max_directory_id().unwrap())
            .unwrap();

        assert_eq!(last_id, 2);
        assert_eq!(store.directory_count(fs_row.id).unwrap(), 2);
        // No duplicate root, and its entry count was filled in.
        let root_dir = store.directory(1).unwrap();
        assert_eq!(root_dir.nfiles, 1);
    }
}
