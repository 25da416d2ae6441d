//! Catalog database schema and access.
//!
//! All persistence goes through [`CatalogStore`], an explicit handle around a
//! single SQLite connection. Each logical batch (a directory's listing, one
//! directory's file rows) commits in its own transaction, so an interrupted
//! scan leaves only whole batches behind and can be resumed.

use std::path::Path;

use rusqlite::{Connection, Row, params};

use crate::error::{Error, Result};
use crate::models::{Directory, File, FileSystem, NewFile};

/// Summary statistics over a whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogStats {
    pub filesystem_count: i64,
    pub directory_count: i64,
    pub file_count: i64,
    pub symlink_count: i64,
    pub total_bytes: i64,
}

/// Handle to one catalog database.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (or create) a catalog database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway in-memory catalog.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Required for the ON DELETE CASCADE ownership chain to be live.
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    /// Create the catalog schema.
    ///
    /// A filesystem owns its directories and a directory owns its files and
    /// child directories; deletes cascade down the tree. The root directory
    /// of each filesystem is its own parent, so the self-reference is legal.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS filesystem (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS directory (
                id INTEGER PRIMARY KEY,
                filesystem_id INTEGER NOT NULL
                    REFERENCES filesystem(id) ON DELETE CASCADE,
                parent_id INTEGER NOT NULL
                    REFERENCES directory(id) ON DELETE CASCADE,
                nfiles INTEGER NOT NULL DEFAULT 0,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_directory_parent ON directory(parent_id);
            CREATE INDEX IF NOT EXISTS idx_directory_filesystem ON directory(filesystem_id);

            CREATE TABLE IF NOT EXISTS file (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                directory_id INTEGER NOT NULL
                    REFERENCES directory(id) ON DELETE CASCADE,
                size INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                name TEXT NOT NULL,
                link INTEGER NOT NULL DEFAULT 0,
                destination TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_file_directory ON file(directory_id);
            "#,
        )?;
        Ok(())
    }

    /// Insert a filesystem row and return it.
    pub fn add_filesystem(&self, name: &str) -> Result<FileSystem> {
        self.conn.execute(
            "INSERT INTO filesystem (name) VALUES (?1)",
            params![name],
        )?;
        Ok(FileSystem {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Look up a filesystem by its (unique) name.
    pub fn filesystem_by_name(&self, name: &str) -> Result<Option<FileSystem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM filesystem WHERE name = ?1")?;
        let mut rows = stmt.query_map(params![name], FileSystem::from_row)?;
        rows.next().transpose().map_err(Error::from)
    }

    /// All filesystem rows, in insertion order.
    pub fn filesystems(&self) -> Result<Vec<FileSystem>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM filesystem ORDER BY id")?;
        let rows = stmt.query_map([], FileSystem::from_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
    }

    /// Fetch one filesystem by id.
    pub fn filesystem(&self, id: i64) -> Result<FileSystem> {
        self.exactly_one(
            "SELECT id, name FROM filesystem WHERE id = ?1",
            params![id],
            FileSystem::from_row,
        )
    }

    /// Fetch one directory by id.
    pub fn directory(&self, id: i64) -> Result<Directory> {
        self.exactly_one(
            "SELECT id, filesystem_id, parent_id, nfiles, name \
             FROM directory WHERE id = ?1",
            params![id],
            Directory::from_row,
        )
    }

    /// The exactly-one directory query the resume logic branches on:
    /// `Err(NoRows)` means the filesystem has never been scanned,
    /// `Err(ManyRows)` means the scan already ran to completion, and a
    /// single row is a seeded-but-unfinished scan.
    pub fn one_directory_for(&self, filesystem_id: i64) -> Result<Directory> {
        self.exactly_one(
            "SELECT id, filesystem_id, parent_id, nfiles, name \
             FROM directory WHERE filesystem_id = ?1",
            params![filesystem_id],
            Directory::from_row,
        )
    }

    /// The file-phase analogue of [`one_directory_for`](Self::one_directory_for).
    pub fn one_file_for(&self, filesystem_id: i64) -> Result<File> {
        self.exactly_one(
            "SELECT f.id, f.directory_id, f.size, f.mtime, f.name, f.link, f.destination \
             FROM file f JOIN directory d ON f.directory_id = d.id \
             WHERE d.filesystem_id = ?1",
            params![filesystem_id],
            File::from_row,
        )
    }

    /// Highest directory id across the whole catalog, 0 when empty. New id
    /// ranges chain from here so ids stay dense and never collide.
    pub fn max_directory_id(&self) -> Result<i64> {
        let max: Option<i64> =
            self.conn
                .query_row("SELECT MAX(id) FROM directory", [], |row| row.get(0))?;
        Ok(max.unwrap_or(0))
    }

    /// Seed the synthetic root directory for a filesystem: empty name,
    /// parented on itself.
    pub fn add_root_directory(&self, filesystem_id: i64, id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO directory (id, filesystem_id, parent_id, name) \
             VALUES (?1, ?2, ?1, '')",
            params![id, filesystem_id],
        )?;
        Ok(())
    }

    /// Persist one walked directory listing as a single batch: set the
    /// directory's non-directory entry count and insert its subdirectories,
    /// ids pre-assigned by the caller.
    pub fn record_listing(
        &self,
        filesystem_id: i64,
        directory_id: i64,
        nfiles: i64,
        children: &[(i64, String)],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE directory SET nfiles = ?1 WHERE id = ?2",
            params![nfiles, directory_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO directory (id, filesystem_id, parent_id, name) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (child_id, name) in children {
                stmt.execute(params![child_id, filesystem_id, directory_id, name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert a directory's file entries in one transaction.
    pub fn add_files(&self, directory_id: i64, files: &[NewFile]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO file (directory_id, size, mtime, name, link, destination) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for f in files {
                stmt.execute(params![
                    directory_id,
                    f.size,
                    f.mtime,
                    f.name,
                    f.link,
                    f.destination
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Directories of a filesystem that have file entries to ingest, in id
    /// (scan) order.
    pub fn directories_with_files(&self, filesystem_id: i64) -> Result<Vec<Directory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filesystem_id, parent_id, nfiles, name \
             FROM directory WHERE filesystem_id = ?1 AND nfiles > 0 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![filesystem_id], Directory::from_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
    }

    /// Number of directory rows recorded for a filesystem.
    pub fn directory_count(&self, filesystem_id: i64) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM directory WHERE filesystem_id = ?1",
                params![filesystem_id],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    /// Number of file rows recorded for a filesystem.
    pub fn file_count(&self, filesystem_id: i64) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM file f JOIN directory d ON f.directory_id = d.id \
                 WHERE d.filesystem_id = ?1",
                params![filesystem_id],
                |row| row.get(0),
            )
            .map_err(Error::from)
    }

    /// File entries of one directory, name order.
    pub fn files_in(&self, directory_id: i64) -> Result<Vec<File>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, directory_id, size, mtime, name, link, destination \
             FROM file WHERE directory_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![directory_id], File::from_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Error::from)
    }

    /// Summary statistics over the whole catalog.
    pub fn stats(&self) -> Result<CatalogStats> {
        let filesystem_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM filesystem", [], |row| row.get(0))?;
        let directory_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))?;
        let file_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))?;
        let symlink_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM file WHERE link", [], |row| row.get(0))?;
        let total_bytes: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size), 0) FROM file",
            [],
            |row| row.get(0),
        )?;

        Ok(CatalogStats {
            filesystem_count,
            directory_count,
            file_count,
            symlink_count,
            total_bytes,
        })
    }

    /// Run a query that must match exactly one row, erroring distinctly on
    /// zero ([`Error::NoRows`]) and on more than one ([`Error::ManyRows`]).
    fn exactly_one<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<T>
    where
        P: rusqlite::Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query_map(params, map)?;
        match rows.next() {
            None => Err(Error::NoRows),
            Some(first) => {
                let first = first?;
                match rows.next() {
                    None => Ok(first),
                    Some(_) => Err(Error::ManyRows),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let store = store();
        store.create_schema().unwrap();
    }

    #[test]
    fn filesystem_names_are_unique() {
        let store = store();
        store.add_filesystem("/data/rel").unwrap();
        assert!(matches!(
            store.add_filesystem("/data/rel"),
            Err(Error::Db(_))
        ));
    }

    #[test]
    fn exactly_one_errors_distinctly() {
        let store = store();
        let fs = store.add_filesystem("/data/rel").unwrap();

        assert!(matches!(store.one_directory_for(fs.id), Err(Error::NoRows)));

        store.add_root_directory(fs.id, 1).unwrap();
        let root = store.one_directory_for(fs.id).unwrap();
        assert_eq!(root.id, 1);
        assert!(root.is_root());
        assert_eq!(root.parent_id, root.id);

        store
            .record_listing(fs.id, 1, 0, &[(2, "sub".to_string())])
            .unwrap();
        assert!(matches!(
            store.one_directory_for(fs.id),
            Err(Error::ManyRows)
        ));
    }

    #[test]
    fn record_listing_sets_nfiles_and_children() {
        let store = store();
        let fs = store.add_filesystem("/data/rel").unwrap();
        store.add_root_directory(fs.id, 1).unwrap();
        store
            .record_listing(fs.id, 1, 3, &[(2, "a".to_string()), (3, "b".to_string())])
            .unwrap();

        let root = store.directory(1).unwrap();
        assert_eq!(root.nfiles, 3);

        let b = store.directory(3).unwrap();
        assert_eq!(b.parent_id, 1);
        assert_eq!(b.name, "b");
        assert_eq!(b.nfiles, 0);

        assert_eq!(store.max_directory_id().unwrap(), 3);
        assert_eq!(store.directory_count(fs.id).unwrap(), 3);
    }

    #[test]
    fn add_files_commits_one_batch() {
        let store = store();
        let fs = store.add_filesystem("/data/rel").unwrap();
        store.add_root_directory(fs.id, 1).unwrap();
        store
            .add_files(
                1,
                &[
                    NewFile::regular("x.txt".to_string(), 10, 1700000000),
                    NewFile::symlink("link".to_string(), "/elsewhere".to_string()),
                ],
            )
            .unwrap();

        let files = store.files_in(1).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "link");
        assert!(files[0].link);
        assert_eq!(files[0].size, 0);
        assert_eq!(files[0].destination, "/elsewhere");
        assert_eq!(files[1].name, "x.txt");
        assert!(!files[1].link);
        assert_eq!(files[1].destination, "");

        let one = store.one_file_for(fs.id);
        assert!(matches!(one, Err(Error::ManyRows)));
    }

    #[test]
    fn cascading_delete_follows_the_tree() {
        let store = store();
        let fs = store.add_filesystem("/data/rel").unwrap();
        store.add_root_directory(fs.id, 1).unwrap();
        store
            .record_listing(fs.id, 1, 1, &[(2, "a".to_string())])
            .unwrap();
        store
            .add_files(2, &[NewFile::regular("x.txt".to_string(), 10, 0)])
            .unwrap();

        store
            .conn
            .execute("DELETE FROM directory WHERE id = 2", [])
            .unwrap();
        let files: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM file", [], |row| row.get(0))
            .unwrap();
        assert_eq!(files, 0);
    }

    #[test]
    fn stats_match_row_counts() {
        let store = store();
        let fs = store.add_filesystem("/data/rel").unwrap();
        store.add_root_directory(fs.id, 1).unwrap();
        store
            .add_files(
                1,
                &[
                    NewFile::regular("x.txt".to_string(), 10, 0),
                    NewFile::symlink("link".to_string(), "/elsewhere".to_string()),
                ],
            )
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.filesystem_count, 1);
        assert_eq!(stats.directory_count, 1);
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.symlink_count, 1);
        assert_eq!(stats.total_bytes, 10);
    }
}
