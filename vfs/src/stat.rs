use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: u32,
    pub mode: DirEntryType,
    /// Size in bytes as recorded by the inode
    pub size: u64,
    /// Occupying data blocks, pointer blocks excluded
    pub blocks: u64,
    pub uid: i32,
    pub gid: i32,
    /// Permission string, e.g. `rw-rw-r--`
    pub perm: String,
    /// Last modification, unix seconds
    pub mtime: i64,
}
