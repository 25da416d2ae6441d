//! Crate error type.

use std::path::PathBuf;

/// Errors produced while building or querying a catalog.
///
/// `NoRows` and `ManyRows` are not failures in the usual sense: the resume
/// logic branches on them to decide whether a filesystem still needs
/// scanning. Every other variant aborts the run; work already committed
/// stays valid for a later resume.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("expected exactly one row, found none")]
    NoRows,

    #[error("expected exactly one row, found more")]
    ManyRows,

    #[error("walker yielded a directory with no recorded id: {0:?}")]
    UnmappedDirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
