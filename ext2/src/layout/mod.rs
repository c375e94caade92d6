//! # 磁盘数据结构层
//!
//! 格式化后分区的布局（偏移均为磁盘绝对偏移）：
//!
//! ```text
//! ┌────────────┬──────────────┬──────────────┬────────────┬────────────┐
//! │ SuperBlock │ inode bitmap │ block bitmap │ inode table│ block pool │
//! │            │   ⌈n/8⌉ B    │  ⌈3n/8⌉ B    │  n inodes  │ 3n blocks  │
//! └────────────┴──────────────┴──────────────┴────────────┴────────────┘
//! ```

mod bitmap;
mod block;
mod inode;
mod super_block;

pub use self::{
    bitmap::Bitmap,
    block::{FIRST_CHILD_SLOT, FileBlock, FolderBlock, FolderEntry, PointerBlock},
    inode::{Access, Inode, InodeKind, Permissions},
    super_block::SuperBlock,
};
