//! Lazy full-path reconstruction for cataloged directories.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Directory, File};
use crate::store::CatalogStore;

/// Maps catalog directories back to real filesystem paths.
///
/// A directory row only stores its own name segment, so the full path is
/// rebuilt by walking the parent chain up to the synthetic root and then
/// prepending the owning filesystem's name. Rows are immutable after
/// creation, so results are memoized unconditionally, keyed by directory id.
#[derive(Debug, Default)]
pub struct PathResolver {
    cache: HashMap<i64, PathBuf>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The absolute filesystem path a directory was discovered at.
    pub fn full_path(&mut self, store: &CatalogStore, dir: &Directory) -> Result<PathBuf> {
        if let Some(path) = self.cache.get(&dir.id) {
            return Ok(path.clone());
        }

        let path = if dir.is_root() {
            PathBuf::from(store.filesystem(dir.filesystem_id)?.name)
        } else {
            let mut segments = vec![dir.name.clone()];
            let mut parent = store.directory(dir.parent_id)?;
            while !parent.is_root() {
                segments.push(parent.name.clone());
                parent = store.directory(parent.parent_id)?;
            }
            let mut path = PathBuf::from(store.filesystem(dir.filesystem_id)?.name);
            for segment in segments.iter().rev() {
                path.push(segment);
            }
            path
        };

        self.cache.insert(dir.id, path.clone());
        Ok(path)
    }

    /// The absolute path of a file entry: its directory's path plus its name.
    pub fn file_path(
        &mut self,
        store: &CatalogStore,
        dir: &Directory,
        file: &File,
    ) -> Result<PathBuf> {
        Ok(self.full_path(store, dir)?.join(&file.name))
    }
}
