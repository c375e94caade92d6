//! # 文件内容

use byte_store::unix_now;
use vfs::{Error, Result};

use crate::BLOCK_SIZE;
use crate::efs::FileSystem;
use crate::indirect::{NewBlock, growth_cost};
use crate::layout::FileBlock;

impl FileSystem {
    /// 读出文件的全部内容，长度以 inode 的`size`为准
    pub fn read_file(&self, index: u32) -> Result<Vec<u8>> {
        let inode = self.inode(index)?;
        if !inode.is_file() {
            return Err(Error::NotAFile(index.to_string()));
        }

        let mut content = Vec::with_capacity(inode.size as usize);
        for block in self.data_blocks(&inode)? {
            content.extend_from_slice(&self.file_block(block)?.content);
        }
        content.truncate(inode.size as usize);

        Ok(content)
    }

    /// 覆写文件内容。
    ///
    /// 已有的数据块按顺序复用，不足时通过与目录相同的扩展路径追加；
    /// 多出的旧块保持分配。每写一块都刷新`mtime`并写回 inode。
    pub fn write_file(&mut self, index: u32, content: &[u8]) -> Result<()> {
        let mut inode = self.inode(index)?;
        if !inode.is_file() {
            return Err(Error::NotAFile(index.to_string()));
        }

        let existing = self.data_blocks(&inode)?;
        let missing = content.len().div_ceil(BLOCK_SIZE).saturating_sub(existing.len());
        // 写第一块之前确认新块够用，失败时原内容不变
        self.reserve(0, growth_cost(existing.len(), missing)?)?;

        for (i, chunk) in content.chunks(BLOCK_SIZE).enumerate() {
            let block = match existing.get(i) {
                Some(&block) => block,
                None => self.grow(&mut inode, NewBlock::File)?,
            };
            self.put_file_block(block, &FileBlock::new(chunk))?;

            inode.mtime = unix_now();
            self.put_inode(index, &inode)?;
        }

        inode.size = content.len() as i32;
        inode.mtime = unix_now();
        self.put_inode(index, &inode)?;
        log::debug!("inode {index} holds {} bytes", content.len());

        Ok(())
    }
}
