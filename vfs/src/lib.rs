//! Types shared by the partition layer and the filesystem layer.

mod dirent;
mod error;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result},
    stat::Stat,
};
