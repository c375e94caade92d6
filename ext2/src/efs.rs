//! # 磁盘块管理器层
//!
//! 在一个分区上构建出文件系统的布局，并负责 inode 与块的分配。

use std::sync::Arc;

use byte_store::{ByteStore, Record, read_record, unix_now, write_record, zero_fill};
use vfs::{DirEntryType, Error, Result, Stat};

use crate::layout::*;
use crate::{BLOCK_SIZE, INODE_SIZE, MAGIC, ROOT, SUPER_BLOCK_SIZE};

/// 每个 inode 摊到的字节：一字节位图余量，inode 本身，以及三个块
const BYTES_PER_INODE: u64 = 1 + INODE_SIZE as u64 + 3 * BLOCK_SIZE as u64;

pub struct FileSystem {
    store: Arc<dyn ByteStore>,
    /// 分区首字节，即超级块位置
    start: u64,
    super_block: SuperBlock,
    inode_bitmap: Bitmap,
    block_bitmap: Bitmap,
}

impl FileSystem {
    /// 在`[start, start + size)`上格式化出空文件系统，仅含根目录。
    pub fn format(store: Arc<dyn ByteStore>, start: u64, size: u64) -> Result<Self> {
        let mut inodes = size.saturating_sub(SUPER_BLOCK_SIZE as u64) / BYTES_PER_INODE;
        while inodes > 0 && SuperBlock::new(start, inodes as u32, 0).end() > start + size {
            inodes -= 1;
        }
        if inodes == 0 {
            return Err(Error::InvalidSize(size as i64));
        }

        zero_fill(store.as_ref(), start, size)?;
        let now = unix_now();
        let super_block = SuperBlock::new(start, inodes as u32, now);
        write_record(store.as_ref(), start, start + size, &super_block)?;

        let mut fs = Self::with_super_block(store, start, super_block);
        let root = fs.alloc_inode()?;
        let block = fs.alloc_block()?;
        debug_assert_eq!((root, block), (ROOT, 0));
        fs.put_folder_block(block, &FolderBlock::new(root, root))?;
        fs.put_inode(root, &Inode::folder(block, Permissions::root(), now))?;

        log::info!(
            "formatted {inodes} inodes and {} blocks at {start}",
            fs.super_block.blocks_count
        );
        Ok(fs)
    }

    /// 打开已格式化的分区
    pub fn open(store: Arc<dyn ByteStore>, start: u64) -> Result<Self> {
        let super_block: SuperBlock = read_record(store.as_ref(), start)?;
        if super_block.magic != MAGIC {
            return Err(Error::NotFormatted);
        }

        Ok(Self::with_super_block(store, start, super_block))
    }

    fn with_super_block(store: Arc<dyn ByteStore>, start: u64, super_block: SuperBlock) -> Self {
        let inode_bitmap = Bitmap::new(
            super_block.bm_inode_start as u64,
            super_block.inodes_count as u32,
        );
        let block_bitmap = Bitmap::new(
            super_block.bm_block_start as u64,
            super_block.blocks_count as u32,
        );

        Self {
            store,
            start,
            super_block,
            inode_bitmap,
            block_bitmap,
        }
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub(crate) fn store(&self) -> &dyn ByteStore {
        self.store.as_ref()
    }

    fn put_super_block(&self) -> Result<()> {
        write_record(
            self.store(),
            self.start,
            self.start + SUPER_BLOCK_SIZE as u64,
            &self.super_block,
        )
    }

    /// 挂载时刷新挂载时间与次数
    pub fn record_mount(&mut self) -> Result<()> {
        self.super_block.mtime = unix_now();
        self.super_block.mnt_count += 1;
        self.put_super_block()
    }

    pub fn record_unmount(&mut self) -> Result<()> {
        self.super_block.umtime = unix_now();
        self.put_super_block()
    }
}

/* 记录的读写 */
impl FileSystem {
    fn inode_pos(&self, index: u32) -> Result<(u64, u64)> {
        let sb = &self.super_block;
        if index >= sb.inodes_count as u32 {
            return Err(Error::Corrupt(format!("inode {index} out of range")));
        }
        let offset = sb.inode_start as u64 + index as u64 * INODE_SIZE as u64;
        Ok((offset, sb.block_start as u64))
    }

    fn block_pos(&self, index: u32) -> Result<(u64, u64)> {
        let sb = &self.super_block;
        if index >= sb.blocks_count as u32 {
            return Err(Error::Corrupt(format!("block {index} out of range")));
        }
        let offset = sb.block_start as u64 + index as u64 * BLOCK_SIZE as u64;
        Ok((offset, sb.end()))
    }

    fn get_block<R: Record>(&self, index: u32) -> Result<R> {
        let (offset, _) = self.block_pos(index)?;
        read_record(self.store(), offset)
    }

    fn put_block<R: Record>(&self, index: u32, block: &R) -> Result<()> {
        let (offset, bound) = self.block_pos(index)?;
        log::debug!("block {index} written at {offset}");
        write_record(self.store(), offset, bound, block)
    }

    pub fn inode(&self, index: u32) -> Result<Inode> {
        let (offset, _) = self.inode_pos(index)?;
        read_record(self.store(), offset)
    }

    pub fn put_inode(&self, index: u32, inode: &Inode) -> Result<()> {
        let (offset, bound) = self.inode_pos(index)?;
        log::debug!("inode {index} written at {offset}");
        write_record(self.store(), offset, bound, inode)
    }

    #[inline]
    pub fn folder_block(&self, index: u32) -> Result<FolderBlock> {
        self.get_block(index)
    }

    #[inline]
    pub fn put_folder_block(&self, index: u32, block: &FolderBlock) -> Result<()> {
        self.put_block(index, block)
    }

    #[inline]
    pub fn file_block(&self, index: u32) -> Result<FileBlock> {
        self.get_block(index)
    }

    #[inline]
    pub fn put_file_block(&self, index: u32, block: &FileBlock) -> Result<()> {
        self.put_block(index, block)
    }

    #[inline]
    pub fn pointer_block(&self, index: u32) -> Result<PointerBlock> {
        self.get_block(index)
    }

    #[inline]
    pub fn put_pointer_block(&self, index: u32, block: &PointerBlock) -> Result<()> {
        self.put_block(index, block)
    }
}

/* 分配 */
impl FileSystem {
    /// 确认还剩足够的 inode 与块
    pub fn reserve(&self, inodes: u32, blocks: u32) -> Result<()> {
        let sb = &self.super_block;
        if (sb.free_inodes_count as u32) < inodes || (sb.free_blocks_count as u32) < blocks {
            return Err(Error::OutOfSpace);
        }
        Ok(())
    }

    pub fn alloc_inode(&mut self) -> Result<u32> {
        let index = self
            .inode_bitmap
            .find_free(self.store())?
            .ok_or(Error::OutOfSpace)?;
        self.mark_inode_used(index)?;
        Ok(index)
    }

    pub fn alloc_block(&mut self) -> Result<u32> {
        let index = self
            .block_bitmap
            .find_free(self.store())?
            .ok_or(Error::OutOfSpace)?;
        self.mark_block_used(index)?;
        Ok(index)
    }

    /// 幂等：重复标记不会再次减少空闲计数
    pub fn mark_inode_used(&mut self, index: u32) -> Result<()> {
        if !self.inode_bitmap.set(self.store(), index)? {
            self.super_block.free_inodes_count -= 1;
        }
        self.super_block.first_ino = next_free(self.inode_bitmap.find_free(self.store())?);
        log::debug!("inode {index} in use");
        self.put_super_block()
    }

    pub fn mark_block_used(&mut self, index: u32) -> Result<()> {
        if !self.block_bitmap.set(self.store(), index)? {
            self.super_block.free_blocks_count -= 1;
        }
        self.super_block.first_blo = next_free(self.block_bitmap.find_free(self.store())?);
        log::debug!("block {index} in use");
        self.put_super_block()
    }

    #[inline]
    pub fn inode_used(&self, index: u32) -> Result<bool> {
        self.inode_bitmap.get(self.store(), index)
    }

    #[inline]
    pub fn block_used(&self, index: u32) -> Result<bool> {
        self.block_bitmap.get(self.store(), index)
    }
}

fn next_free(index: Option<u32>) -> i32 {
    index.map_or(crate::NULL, |index| index as i32)
}

impl FileSystem {
    pub fn stat(&self, index: u32) -> Result<Stat> {
        let inode = self.inode(index)?;
        Ok(Stat {
            inode: index,
            mode: if inode.is_folder() {
                DirEntryType::Directory
            } else {
                DirEntryType::Regular
            },
            size: inode.size as u64,
            blocks: self.data_blocks(&inode)?.len() as u64,
            uid: inode.uid,
            gid: inode.gid,
            perm: inode.permissions().to_string(),
            mtime: inode.mtime,
        })
    }
}

/// 空闲计数与位图相符，且每个已标记的 inode 与块都能从根目录到达
#[cfg(test)]
pub(crate) fn assert_accounted(fs: &FileSystem) {
    let sb = fs.super_block();
    let used_inodes = (0..sb.inodes_count as u32)
        .filter(|&index| fs.inode_used(index).unwrap())
        .count();
    let used_blocks = (0..sb.blocks_count as u32)
        .filter(|&index| fs.block_used(index).unwrap())
        .count();
    assert_eq!(sb.free_inodes_count as usize + used_inodes, sb.inodes_count as usize);
    assert_eq!(sb.free_blocks_count as usize + used_blocks, sb.blocks_count as usize);

    let (mut inodes, mut blocks) = (0, 0);
    let mut pending = vec![ROOT];
    while let Some(index) = pending.pop() {
        let inode = fs.inode(index).unwrap();
        inodes += 1;
        blocks += fs.tree_blocks(&inode).unwrap();
        if inode.is_folder() {
            pending.extend(fs.read_dir(index).unwrap().into_iter().map(|entry| entry.inode));
        }
    }
    assert_eq!(inodes, used_inodes, "unreachable inode marked used");
    assert_eq!(blocks, used_blocks, "unreachable block marked used");
}

#[cfg(test)]
mod tests {
    use byte_store::MemStore;

    use super::*;

    fn store(size: usize) -> Arc<dyn ByteStore> {
        Arc::new(MemStore::new(size))
    }

    #[test]
    fn format_counts() {
        let fs = FileSystem::format(store(8192), 0, 8192).unwrap();
        let sb = fs.super_block();
        assert_eq!(sb.inodes_count, 27);
        assert_eq!(sb.blocks_count, 81);
        assert_eq!(sb.free_inodes_count, 26);
        assert_eq!(sb.free_blocks_count, 80);
        assert_eq!(sb.first_ino, 1);
        assert_eq!(sb.first_blo, 1);
        assert_eq!(sb.magic, MAGIC);
        assert!(sb.end() <= 8192);

        let root = fs.inode(ROOT).unwrap();
        assert!(root.is_folder());
        assert_eq!(root.block[0], 0);
        assert_eq!(&root.perm, b"777");
        let block = fs.folder_block(0).unwrap();
        assert_eq!((block.this(), block.parent()), (0, 0));
    }

    #[test]
    fn format_at_offset_and_reopen() {
        let store = store(70_000);
        FileSystem::format(store.clone(), 1000, 65536).unwrap();

        assert!(matches!(
            FileSystem::open(store.clone(), 0),
            Err(Error::NotFormatted)
        ));
        let mut fs = FileSystem::open(store, 1000).unwrap();
        assert_eq!(fs.super_block().inodes_count, 223);
        assert_eq!(fs.super_block().bm_inode_start, 1000 + SUPER_BLOCK_SIZE as i64);

        fs.record_mount().unwrap();
        fs.record_mount().unwrap();
        assert_eq!(fs.super_block().mnt_count, 2);
    }

    #[test]
    fn too_small() {
        assert!(matches!(
            FileSystem::format(store(200), 0, 200),
            Err(Error::InvalidSize(200))
        ));
    }

    #[test]
    fn marking_is_idempotent() {
        let mut fs = FileSystem::format(store(8192), 0, 8192).unwrap();
        let free = fs.super_block().free_blocks_count;

        fs.mark_block_used(5).unwrap();
        fs.mark_block_used(5).unwrap();
        assert_eq!(fs.super_block().free_blocks_count, free - 1);
        assert!(fs.block_used(5).unwrap());
        assert_eq!(fs.super_block().first_blo, 1);

        fs.mark_inode_used(0).unwrap();
        assert_eq!(fs.super_block().free_inodes_count, 26);
    }

    #[test]
    fn exhaustion() {
        let mut fs = FileSystem::format(store(8192), 0, 8192).unwrap();
        for _ in 1..27 {
            fs.alloc_inode().unwrap();
        }
        assert_eq!(fs.super_block().first_ino, -1);
        assert!(matches!(fs.alloc_inode(), Err(Error::OutOfSpace)));
    }
}
