//! 间接指针树
//!
//! 块指针`s`的深度为`s - 11`（直接指针为0）：深度`d`的指针指向一棵高`d`的指针块树，
//! 叶子是数据块。遍历与扩展都是同一个按深度参数化的递归。

use core::ops::ControlFlow;

use vfs::{Error, Result};

use crate::efs::FileSystem;
use crate::layout::{FileBlock, FolderBlock, Inode, PointerBlock};
use crate::{DIRECT_COUNT, NULL, POINTER_COUNT, POINTERS_PER_BLOCK};

/// 间接树的层数
const INDIRECT_DEPTHS: u32 = 3;

/// 新数据块的初始内容
#[derive(Debug, Clone, Copy)]
pub enum NewBlock {
    /// 槽0、1分别指向`this`与`parent`的目录块
    Folder { this: u32, parent: u32 },
    /// 全0的文件块
    File,
}

#[inline]
fn depth_of(slot: usize) -> u32 {
    slot.saturating_sub(DIRECT_COUNT - 1) as u32
}

/// 树中有`leaves`个数据块时所需的指针块数。
///
/// 扩展总是深度优先地取第一个空位，且块从不释放，所以树总是紧凑的，
/// 指针块数只取决于数据块数。深度`d`的子树装`r`个数据块时，
/// 第`k`层要`⌈r / 16^k⌉`个指针块。
fn pointer_blocks(leaves: usize) -> usize {
    let mut rest = leaves.saturating_sub(DIRECT_COUNT);
    let mut total = 0;
    for depth in 1..=INDIRECT_DEPTHS {
        let here = rest.min(POINTERS_PER_BLOCK.pow(depth));
        total += (1..=depth)
            .map(|k| here.div_ceil(POINTERS_PER_BLOCK.pow(k)))
            .sum::<usize>();
        rest -= here;
    }
    total
}

/// 单个 inode 最多能挂的数据块
fn max_leaves() -> usize {
    DIRECT_COUNT
        + (1..=INDIRECT_DEPTHS)
            .map(|depth| POINTERS_PER_BLOCK.pow(depth))
            .sum::<usize>()
}

/// 已有`leaves`个数据块的树再扩展`extra`次要分配的块数，指针块计在内。
///
/// 超出单个 inode 的容量时返回[`Error::OutOfSpace`]。
pub fn growth_cost(leaves: usize, extra: usize) -> Result<u32> {
    let target = leaves + extra;
    if target > max_leaves() {
        return Err(Error::OutOfSpace);
    }
    Ok((extra + pointer_blocks(target) - pointer_blocks(leaves)) as u32)
}

impl FileSystem {
    /// 按直接、一级、二级、三级的顺序深度优先访问`inode`的数据块，
    /// `visit`返回`Break`时提前结束。
    pub fn walk<T>(
        &self,
        inode: &Inode,
        visit: &mut impl FnMut(u32) -> Result<ControlFlow<T>>,
    ) -> Result<Option<T>> {
        for (slot, &pointer) in inode.block.iter().enumerate() {
            if pointer == NULL {
                continue;
            }
            if let Some(found) = self.walk_from(pointer as u32, depth_of(slot), visit)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    fn walk_from<T>(
        &self,
        block: u32,
        depth: u32,
        visit: &mut impl FnMut(u32) -> Result<ControlFlow<T>>,
    ) -> Result<Option<T>> {
        if depth == 0 {
            return Ok(match visit(block)? {
                ControlFlow::Break(found) => Some(found),
                ControlFlow::Continue(()) => None,
            });
        }

        let pointers = self.pointer_block(block)?;
        for &pointer in pointers.pointers.iter().filter(|&&pointer| pointer != NULL) {
            if let Some(found) = self.walk_from(pointer as u32, depth - 1, visit)? {
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    /// 全部数据块编号，按遍历顺序
    pub fn data_blocks(&self, inode: &Inode) -> Result<Vec<u32>> {
        let mut blocks = Vec::new();
        self.walk(inode, &mut |block| {
            blocks.push(block);
            Ok(ControlFlow::<()>::Continue(()))
        })?;
        Ok(blocks)
    }

    /// 为`inode`挂上一个新数据块并返回其编号。
    ///
    /// 先用空的直接指针，再依次在一级、二级、三级树中深度优先地找第一个空位，
    /// 指针块按需分配。`inode`只在内存中修改，由调用方写回。
    pub fn grow(&mut self, inode: &mut Inode, new: NewBlock) -> Result<u32> {
        for slot in 0..POINTER_COUNT {
            let depth = depth_of(slot);
            let pointer = inode.block[slot];

            if pointer == NULL {
                let (top, leaf) = self.alloc_chain(depth, new)?;
                inode.block[slot] = top as i32;
                return Ok(leaf);
            }
            if depth > 0
                && let Some(leaf) = self.grow_from(pointer as u32, depth, new)?
            {
                return Ok(leaf);
            }
        }

        Err(Error::OutOfSpace)
    }

    fn grow_from(&mut self, block: u32, depth: u32, new: NewBlock) -> Result<Option<u32>> {
        let mut pointers = self.pointer_block(block)?;

        for index in 0..pointers.pointers.len() {
            let pointer = pointers.pointers[index];
            if pointer == NULL {
                let (top, leaf) = self.alloc_chain(depth - 1, new)?;
                pointers.pointers[index] = top as i32;
                self.put_pointer_block(block, &pointers)?;
                return Ok(Some(leaf));
            }
            if depth > 1
                && let Some(leaf) = self.grow_from(pointer as u32, depth - 1, new)?
            {
                return Ok(Some(leaf));
            }
        }

        Ok(None)
    }

    /// 分配一条高`depth`的链：`depth`个指针块加一个数据块，返回`(链首, 数据块)`
    fn alloc_chain(&mut self, depth: u32, new: NewBlock) -> Result<(u32, u32)> {
        self.reserve(0, depth + 1)?;

        if depth == 0 {
            let leaf = self.alloc_block()?;
            match new {
                NewBlock::Folder { this, parent } => {
                    self.put_folder_block(leaf, &FolderBlock::new(this, parent))?
                }
                NewBlock::File => self.put_file_block(leaf, &FileBlock::new(&[]))?,
            }
            return Ok((leaf, leaf));
        }

        let top = self.alloc_block()?;
        let (child, leaf) = self.alloc_chain(depth - 1, new)?;
        let mut pointers = PointerBlock::EMPTY;
        pointers.pointers[0] = child as i32;
        self.put_pointer_block(top, &pointers)?;
        log::debug!("pointer block {top} allocated at depth {depth}");

        Ok((top, leaf))
    }
}

#[cfg(test)]
impl FileSystem {
    /// `inode`占用的全部块，指针块计在内
    pub(crate) fn tree_blocks(&self, inode: &Inode) -> Result<usize> {
        let mut total = 0;
        for (slot, &pointer) in inode.block.iter().enumerate() {
            if pointer != NULL {
                total += self.subtree_blocks(pointer as u32, depth_of(slot))?;
            }
        }
        Ok(total)
    }

    fn subtree_blocks(&self, block: u32, depth: u32) -> Result<usize> {
        if depth == 0 {
            return Ok(1);
        }
        let mut total = 1;
        for &pointer in self.pointer_block(block)?.pointers.iter() {
            if pointer != NULL {
                total += self.subtree_blocks(pointer as u32, depth - 1)?;
            }
        }
        Ok(total)
    }
}
