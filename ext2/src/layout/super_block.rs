use binrw::binrw;
use byte_store::Record;

use crate::{BLOCK_SIZE, FS_TYPE, INODE_SIZE, MAGIC, SUPER_BLOCK_SIZE};

/// 超级块，位于分区首字节
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    pub filesystem_type: i32,
    pub inodes_count: i32,
    pub blocks_count: i32,
    pub free_inodes_count: i32,
    pub free_blocks_count: i32,
    /// 最近挂载时间
    pub mtime: i64,
    /// 最近卸载时间
    pub umtime: i64,
    pub mnt_count: i32,
    pub magic: i32,
    pub inode_size: i32,
    pub block_size: i32,
    /// 首个空闲inode，耗尽时为-1
    pub first_ino: i32,
    /// 首个空闲块，耗尽时为-1
    pub first_blo: i32,
    pub bm_inode_start: i64,
    pub bm_block_start: i64,
    pub inode_start: i64,
    pub block_start: i64,
}

impl SuperBlock {
    /// Layout for `inodes` inodes starting at `start`, all records free.
    pub fn new(start: u64, inodes: u32, now: i64) -> Self {
        let blocks = inodes * 3;
        let bm_inode_start = start + SUPER_BLOCK_SIZE as u64;
        let bm_block_start = bm_inode_start + inodes.div_ceil(8) as u64;
        let inode_start = bm_block_start + blocks.div_ceil(8) as u64;
        let block_start = inode_start + inodes as u64 * INODE_SIZE as u64;

        Self {
            filesystem_type: FS_TYPE,
            inodes_count: inodes as i32,
            blocks_count: blocks as i32,
            free_inodes_count: inodes as i32,
            free_blocks_count: blocks as i32,
            mtime: now,
            umtime: now,
            mnt_count: 0,
            magic: MAGIC,
            inode_size: INODE_SIZE as i32,
            block_size: BLOCK_SIZE as i32,
            first_ino: 0,
            first_blo: 0,
            bm_inode_start: bm_inode_start as i64,
            bm_block_start: bm_block_start as i64,
            inode_start: inode_start as i64,
            block_start: block_start as i64,
        }
    }

    /// 块池末尾（不含）
    #[inline]
    pub fn end(&self) -> u64 {
        self.block_start as u64 + self.blocks_count as u64 * BLOCK_SIZE as u64
    }
}

impl Record for SuperBlock {
    const SIZE: usize = SUPER_BLOCK_SIZE;
}
