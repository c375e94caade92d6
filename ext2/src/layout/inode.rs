//! inode 记录
//!
//! `block` 的15个指针：
//! - 0..12：直接指向数据块
//! - 12：一级间接，指向一个指针块，其中每项指向数据块
//! - 13：二级间接，指针块的每项指向一个一级指针块
//! - 14：三级间接，指针块的每项指向一个二级指针块
//!
//! 目录的数据块是 [`FolderBlock`](super::FolderBlock)，
//! 文件的数据块是 [`FileBlock`](super::FileBlock)。

use core::fmt;

use binrw::binrw;
use byte_store::Record;
use enumflags2::{BitFlags, bitflags};

use crate::{BLOCK_SIZE, INODE_SIZE, NULL, POINTER_COUNT};

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub uid: i32,
    pub gid: i32,
    /// 文件为内容字节数，目录为目录块字节数
    pub size: i32,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
    /// 块指针，-1表示空
    pub block: [i32; POINTER_COUNT],
    pub kind: InodeKind,
    /// 三位ASCII八进制数字：属主、属组、其他
    pub perm: [u8; 3],
}

impl Inode {
    pub fn new(kind: InodeKind, perm: Permissions, now: i64) -> Self {
        Self {
            uid: 1,
            gid: 1,
            size: 0,
            atime: now,
            ctime: now,
            mtime: now,
            block: [NULL; POINTER_COUNT],
            kind,
            perm: perm.to_ascii(),
        }
    }

    /// 带有首个目录块的目录
    pub fn folder(first_block: u32, perm: Permissions, now: i64) -> Self {
        let mut inode = Self::new(InodeKind::Folder, perm, now);
        inode.block[0] = first_block as i32;
        inode.size = BLOCK_SIZE as i32;
        inode
    }

    #[inline]
    pub fn is_folder(&self) -> bool {
        self.kind == InodeKind::Folder
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == InodeKind::File
    }

    #[inline]
    pub fn permissions(&self) -> Permissions {
        Permissions::from_ascii(self.perm)
    }
}

impl Record for Inode {
    const SIZE: usize = INODE_SIZE;
}

#[binrw]
#[brw(repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InodeKind {
    Folder = b'0',
    File = b'1',
}

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Execute = 0b001,
    Write = 0b010,
    Read = 0b100,
}

/// 属主、属组、其他三组访问权限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub owner: BitFlags<Access>,
    pub group: BitFlags<Access>,
    pub other: BitFlags<Access>,
}

impl Permissions {
    /// 根目录的`777`
    pub fn root() -> Self {
        Self::octal(0o777)
    }

    /// 新建项的`664`
    pub fn default_entry() -> Self {
        Self::octal(0o664)
    }

    pub fn octal(mode: u16) -> Self {
        let digit = |shift: u16| BitFlags::from_bits_truncate(((mode >> shift) & 0o7) as u8);
        Self {
            owner: digit(6),
            group: digit(3),
            other: digit(0),
        }
    }

    /// 非八进制数字的位被当作无权限
    pub fn from_ascii(digits: [u8; 3]) -> Self {
        let digit = |d: u8| BitFlags::from_bits_truncate(d.wrapping_sub(b'0') & 0o7);
        Self {
            owner: digit(digits[0]),
            group: digit(digits[1]),
            other: digit(digits[2]),
        }
    }

    pub fn to_ascii(self) -> [u8; 3] {
        [self.owner, self.group, self.other].map(|access| b'0' + access.bits())
    }
}

impl fmt::Display for Permissions {
    /// `rwxrw-r--` 形式
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for access in [self.owner, self.group, self.other] {
            for (flag, c) in [(Access::Read, 'r'), (Access::Write, 'w'), (Access::Execute, 'x')] {
                write!(f, "{}", if access.contains(flag) { c } else { '-' })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_digits() {
        assert_eq!(Permissions::default_entry().to_ascii(), *b"664");
        assert_eq!(Permissions::from_ascii(*b"750"), Permissions::octal(0o750));
        assert_eq!(Permissions::octal(0o754).to_string(), "rwxr-xr--");
        assert_eq!(Permissions::root().to_string(), "rwxrwxrwx");
    }
}
