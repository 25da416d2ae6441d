//! Row structs for the catalog tables.

use rusqlite::Row;

/// One scanned root: a dataset at a particular storage location.
///
/// The name is the absolute root path, release label included. Created once
/// per configured root and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystem {
    pub id: i64,
    pub name: String,
}

impl FileSystem {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

/// One node in a per-filesystem directory hierarchy (adjacency list).
///
/// Ids are dense and assigned in scan order across the whole catalog. The
/// filesystem's mount root is the single row with an empty name, and it is
/// its own parent; every other row's parent chain terminates there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub filesystem_id: i64,
    pub parent_id: i64,
    /// Count of immediate non-directory entries, set once from the walker's
    /// listing of this directory.
    pub nfiles: i64,
    /// This directory's own name segment; empty only for the root.
    pub name: String,
}

impl Directory {
    /// Whether this row is the synthetic root of its filesystem.
    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filesystem_id: row.get(1)?,
            parent_id: row.get(2)?,
            nfiles: row.get(3)?,
            name: row.get(4)?,
        })
    }
}

/// One non-directory entry (ordinary file or symlink) inside a cataloged
/// directory.
///
/// Symlinks always carry `size == 0`, `mtime == 0` and the raw, unresolved
/// link target in `destination`; ordinary files never carry a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub id: i64,
    pub directory_id: i64,
    pub size: i64,
    /// Modification time, integer seconds since the epoch.
    pub mtime: i64,
    pub name: String,
    pub link: bool,
    pub destination: String,
}

impl File {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            directory_id: row.get(1)?,
            size: row.get(2)?,
            mtime: row.get(3)?,
            name: row.get(4)?,
            link: row.get(5)?,
            destination: row.get(6)?,
        })
    }
}

/// A file entry about to be inserted; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub size: i64,
    pub mtime: i64,
    pub name: String,
    pub link: bool,
    pub destination: String,
}

impl NewFile {
    /// An ordinary (non-symlink) file entry.
    pub fn regular(name: String, size: i64, mtime: i64) -> Self {
        Self {
            size,
            mtime,
            name,
            link: false,
            destination: String::new(),
        }
    }

    /// A symlink entry with its raw, unresolved target.
    pub fn symlink(name: String, destination: String) -> Self {
        Self {
            size: 0,
            mtime: 0,
            name,
            link: true,
            destination,
        }
    }
}
