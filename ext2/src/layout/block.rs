//! 块池中的三种块，均为 [`BLOCK_SIZE`](crate::BLOCK_SIZE) 字节

use binrw::binrw;
use byte_store::{Record, decode_name, encode_name};
use vfs::Result;

use crate::{BLOCK_SIZE, FOLDER_SLOTS, NAME_LEN, NULL, POINTERS_PER_BLOCK};

/// 目录块：槽0指向自身，槽1指向父目录，槽2、3存放子项
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderBlock {
    pub entries: [FolderEntry; FOLDER_SLOTS],
}

/// 首个可存放子项的槽
pub const FIRST_CHILD_SLOT: usize = 2;

impl FolderBlock {
    pub fn new(this: u32, parent: u32) -> Self {
        Self {
            entries: [
                FolderEntry::with_name(".", this),
                FolderEntry::with_name("..", parent),
                FolderEntry::EMPTY,
                FolderEntry::EMPTY,
            ],
        }
    }

    #[inline]
    pub fn this(&self) -> i32 {
        self.entries[0].inode
    }

    #[inline]
    pub fn parent(&self) -> i32 {
        self.entries[1].inode
    }

    /// 已用的子项槽，`(槽号, 子项)`
    pub fn children(&self) -> impl Iterator<Item = (usize, &FolderEntry)> {
        self.entries
            .iter()
            .enumerate()
            .skip(FIRST_CHILD_SLOT)
            .filter(|(_, entry)| !entry.is_empty())
    }

    pub fn free_slot(&self) -> Option<usize> {
        (FIRST_CHILD_SLOT..FOLDER_SLOTS).find(|&slot| self.entries[slot].is_empty())
    }
}

impl Record for FolderBlock {
    const SIZE: usize = BLOCK_SIZE;
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: [u8; NAME_LEN],
    /// -1表示空槽
    pub inode: i32,
}

impl FolderEntry {
    pub const EMPTY: Self = Self {
        name: [0; NAME_LEN],
        inode: NULL,
    };

    pub fn new(name: &str, inode: u32) -> Result<Self> {
        Ok(Self {
            name: encode_name(name)?,
            inode: inode as i32,
        })
    }

    /// 仅用于`.`与`..`这类已知不超长的名字
    fn with_name(name: &str, inode: u32) -> Self {
        let mut field = [0; NAME_LEN];
        field[..name.len()].copy_from_slice(name.as_bytes());
        Self {
            name: field,
            inode: inode as i32,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inode == NULL
    }

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }
}

/// 文件块：原始内容
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub content: [u8; BLOCK_SIZE],
}

impl FileBlock {
    /// 不足一块的部分以0填充
    pub fn new(chunk: &[u8]) -> Self {
        let mut content = [0; BLOCK_SIZE];
        content[..chunk.len()].copy_from_slice(chunk);
        Self { content }
    }
}

impl Record for FileBlock {
    const SIZE: usize = BLOCK_SIZE;
}

/// 指针块：16个块编号，-1表示空
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBlock {
    pub pointers: [i32; POINTERS_PER_BLOCK],
}

impl PointerBlock {
    pub const EMPTY: Self = Self {
        pointers: [NULL; POINTERS_PER_BLOCK],
    };
}

impl Record for PointerBlock {
    const SIZE: usize = BLOCK_SIZE;
}
