use std::io;

use thiserror::Error;

/// Failure kinds of every disk operation.
///
/// `NoSpaceAvailable` concerns the partition table,
/// `OutOfSpace` concerns the inode/block bitmaps of a filesystem.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid size: {0}")]
    InvalidSize(i64),

    #[error("disk size {size} is below the minimum of {min} bytes")]
    DiskTooSmall { size: i64, min: u64 },

    #[error("invalid partition type: {0}")]
    InvalidPartitionType(String),

    #[error("name already in use: {0}")]
    DuplicateName(String),

    #[error("no space available for {0} bytes")]
    NoSpaceAvailable(i64),

    #[error("out of space: no free inode or block left")]
    OutOfSpace,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not mounted: {0}")]
    NotMounted(String),

    #[error("partition is not primary: {0}")]
    NotPrimary(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("name too long: {0}")]
    NameTooLong(String),

    #[error("partition is not formatted")]
    NotFormatted,

    #[error("partition is mounted: {0}")]
    Busy(String),

    #[error("no mount letter left for disk {0}")]
    NoMountLetter(String),

    #[error("record at offset {offset} crosses bound {bound}")]
    OutOfBounds { offset: u64, bound: u64 },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("I/O failure: {0}")]
    IoFailure(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
