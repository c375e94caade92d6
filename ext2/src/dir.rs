//! # 目录树
//!
//! 路径解析与子项插入。目录块的槽0、1固定为自身与父目录，
//! 查找只看槽2、3。

use core::ops::ControlFlow;

use byte_store::unix_now;
use vfs::{DirEntry, DirEntryType, Error, Result};

use crate::efs::FileSystem;
use crate::indirect::{NewBlock, growth_cost};
use crate::layout::{FIRST_CHILD_SLOT, FolderBlock, FolderEntry, Inode, InodeKind, Permissions};
use crate::{BLOCK_SIZE, NAME_LEN};

impl FileSystem {
    /// 在目录`dir`中按名字查找子项
    pub fn lookup(&self, dir: u32, name: &str) -> Result<Option<u32>> {
        let inode = self.inode(dir)?;
        if !inode.is_folder() {
            return Err(Error::NotADirectory(name.to_owned()));
        }

        self.walk(&inode, &mut |block| {
            let folder = self.folder_block(block)?;
            Ok(match folder.children().find(|(_, entry)| entry.name() == name) {
                Some((_, entry)) => ControlFlow::Break(entry.inode as u32),
                None => ControlFlow::Continue(()),
            })
        })
    }

    /// 从`root`出发逐级解析`segments`，空路径即`root`本身
    pub fn resolve(&self, root: u32, segments: &[&str]) -> Result<u32> {
        segments.iter().try_fold(root, |current, &segment| {
            self.lookup(current, segment)?
                .ok_or_else(|| Error::PathNotFound(segment.to_owned()))
        })
    }

    /// 在`root`下创建`segments`所指的文件或目录，返回其 inode 编号。
    ///
    /// 缺失的中间目录仅在`create_parents`时创建；已存在的同名文件被直接复用。
    pub fn insert(
        &mut self,
        root: u32,
        segments: &[&str],
        is_file: bool,
        create_parents: bool,
    ) -> Result<u32> {
        let Some((&name, parents)) = segments.split_last() else {
            return Err(Error::DuplicateName("/".to_owned()));
        };

        let mut parent = root;
        for &segment in parents {
            parent = match self.lookup(parent, segment)? {
                Some(child) => child,
                None if create_parents => self.add_entry(parent, segment, InodeKind::Folder)?,
                None => return Err(Error::PathNotFound(segment.to_owned())),
            };
        }

        match self.lookup(parent, name)? {
            Some(existing) if is_file && self.inode(existing)?.is_file() => Ok(existing),
            Some(_) => Err(Error::DuplicateName(name.to_owned())),
            None => {
                let kind = if is_file {
                    InodeKind::File
                } else {
                    InodeKind::Folder
                };
                self.add_entry(parent, name, kind)
            }
        }
    }

    /// 在目录`parent`中新建名为`name`的子项
    fn add_entry(&mut self, parent: u32, name: &str, kind: InodeKind) -> Result<u32> {
        if name.len() > NAME_LEN {
            return Err(Error::NameTooLong(name.to_owned()));
        }
        let child_blocks = match kind {
            InodeKind::Folder => 1,
            InodeKind::File => 0,
        };

        let mut parent_inode = self.inode(parent)?;
        let free_slot = self.free_slot(&parent_inode)?;
        let grow_blocks = match free_slot {
            Some(_) => 0,
            None => growth_cost(self.data_blocks(&parent_inode)?.len(), 1)?,
        };
        // 任何分配之前一次性确认，失败时不留下已标记的记录
        self.reserve(1, child_blocks + grow_blocks)?;

        let (block, slot) = match free_slot {
            Some(found) => found,
            None => {
                let grandparent = self.parent_of(parent)?;
                let block = self.grow(
                    &mut parent_inode,
                    NewBlock::Folder {
                        this: parent,
                        parent: grandparent,
                    },
                )?;
                parent_inode.size += BLOCK_SIZE as i32;
                (block, FIRST_CHILD_SLOT)
            }
        };

        let now = unix_now();
        let child = self.alloc_inode()?;
        let child_inode = match kind {
            InodeKind::Folder => {
                let first = self.alloc_block()?;
                self.put_folder_block(first, &FolderBlock::new(child, parent))?;
                Inode::folder(first, Permissions::default_entry(), now)
            }
            InodeKind::File => Inode::new(InodeKind::File, Permissions::default_entry(), now),
        };
        self.put_inode(child, &child_inode)?;

        let mut folder = self.folder_block(block)?;
        folder.entries[slot] = FolderEntry::new(name, child)?;
        self.put_folder_block(block, &folder)?;

        parent_inode.mtime = now;
        self.put_inode(parent, &parent_inode)?;
        log::info!("{kind:?} {name} created as inode {child} under {parent}");

        Ok(child)
    }

    /// 第一个空槽：`(目录块, 槽号)`
    fn free_slot(&self, dir: &Inode) -> Result<Option<(u32, usize)>> {
        self.walk(dir, &mut |block| {
            Ok(match self.folder_block(block)?.free_slot() {
                Some(slot) => ControlFlow::Break((block, slot)),
                None => ControlFlow::Continue(()),
            })
        })
    }

    /// 目录的父目录，取自其首个目录块的槽1
    pub fn parent_of(&self, dir: u32) -> Result<u32> {
        let inode = self.inode(dir)?;
        if !inode.is_folder() {
            return Err(Error::NotADirectory(dir.to_string()));
        }

        let first = self
            .data_blocks(&inode)?
            .first()
            .copied()
            .ok_or_else(|| Error::Corrupt(format!("folder {dir} has no block")))?;
        Ok(self.folder_block(first)?.parent() as u32)
    }

    /// 目录的全部子项
    pub fn read_dir(&self, dir: u32) -> Result<Vec<DirEntry>> {
        let inode = self.inode(dir)?;
        if !inode.is_folder() {
            return Err(Error::NotADirectory(dir.to_string()));
        }

        let mut entries = Vec::new();
        for block in self.data_blocks(&inode)? {
            for (_, entry) in self.folder_block(block)?.children() {
                let child = self.inode(entry.inode as u32)?;
                entries.push(DirEntry {
                    inode: entry.inode as u32,
                    ty: if child.is_folder() {
                        DirEntryType::Directory
                    } else {
                        DirEntryType::Regular
                    },
                    name: entry.name(),
                });
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use byte_store::MemStore;

    use super::*;
    use crate::efs::assert_accounted;
    use crate::{NULL, ROOT, split_path};

    fn fs(size: usize) -> FileSystem {
        FileSystem::format(Arc::new(MemStore::new(size)), 0, size as u64).unwrap()
    }

    #[test]
    fn insert_then_resolve() {
        let mut fs = fs(8192);
        let docs = fs.insert(ROOT, &split_path("/home/docs"), false, true).unwrap();
        let home = fs.resolve(ROOT, &["home"]).unwrap();
        assert_eq!(fs.resolve(ROOT, &split_path("/home/docs")).unwrap(), docs);
        assert_eq!(fs.parent_of(docs).unwrap(), home);
        assert_eq!(fs.parent_of(home).unwrap(), ROOT);
        assert_eq!(fs.resolve(ROOT, &[]).unwrap(), ROOT);

        assert!(matches!(
            fs.resolve(ROOT, &["nope"]),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn parents_only_on_request() {
        let mut fs = fs(8192);
        assert!(matches!(
            fs.insert(ROOT, &["a", "b"], false, false),
            Err(Error::PathNotFound(_))
        ));
        // 失败的插入不消耗任何记录
        assert_eq!(fs.super_block().free_inodes_count, 26);
    }

    #[test]
    fn duplicates() {
        let mut fs = fs(8192);
        let file = fs.insert(ROOT, &["f.txt"], true, false).unwrap();
        assert_eq!(fs.insert(ROOT, &["f.txt"], true, false).unwrap(), file);
        assert!(matches!(
            fs.insert(ROOT, &["f.txt"], false, false),
            Err(Error::DuplicateName(_))
        ));

        fs.insert(ROOT, &["dir"], false, false).unwrap();
        assert!(matches!(
            fs.insert(ROOT, &["dir"], false, false),
            Err(Error::DuplicateName(_))
        ));
        assert!(matches!(
            fs.insert(ROOT, &["dir"], true, false),
            Err(Error::DuplicateName(_))
        ));

        assert!(matches!(
            fs.insert(ROOT, &["f.txt", "x"], true, false),
            Err(Error::NotADirectory(_))
        ));
        assert!(matches!(
            fs.insert(ROOT, &["a-very-long-name"], true, false),
            Err(Error::NameTooLong(_))
        ));
    }

    #[test]
    fn folder_grows_into_indirect_blocks() {
        let mut fs = fs(64 * 1024);
        // 每个目录块2个空槽，12个直接块之后需要一级间接块
        let names: Vec<String> = (0..30).map(|i| format!("f{i}")).collect();
        for name in &names {
            fs.insert(ROOT, &[name.as_str()], true, false).unwrap();
        }

        let root = fs.inode(ROOT).unwrap();
        assert_ne!(root.block[12], NULL);
        assert_eq!(root.size, 15 * BLOCK_SIZE as i32);

        let listed: Vec<_> = fs.read_dir(ROOT).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(listed, names);
        assert_eq!(fs.resolve(ROOT, &["f29"]).unwrap(), 30);

        for block in fs.data_blocks(&root).unwrap() {
            let folder = fs.folder_block(block).unwrap();
            assert_eq!((folder.this(), folder.parent()), (0, 0));
        }
    }

    #[test]
    fn failed_folder_insert_leaves_no_trace() {
        let mut fs = fs(8192);
        let file = fs.insert(ROOT, &["f"], true, false).unwrap();
        fs.insert(ROOT, &["d0"], false, false).unwrap();
        // 73个数据块加5个指针块，恰好剩一块
        fs.write_file(file, &vec![b'a'; 73 * BLOCK_SIZE]).unwrap();
        assert_eq!(fs.super_block().free_blocks_count, 1);

        // 根目录要扩一块，新目录自己还要一块
        let before = fs.super_block().clone();
        assert!(matches!(
            fs.insert(ROOT, &["x"], false, false),
            Err(Error::OutOfSpace)
        ));
        assert_eq!(fs.super_block().free_inodes_count, before.free_inodes_count);
        assert_eq!(fs.super_block().free_blocks_count, before.free_blocks_count);
        assert_eq!(fs.inode(ROOT).unwrap().block[1], NULL);
        assert_eq!(fs.lookup(ROOT, "x").unwrap(), None);
        assert_accounted(&fs);

        // 文件只需扩展根目录
        fs.insert(ROOT, &["y"], true, false).unwrap();
        assert_eq!(fs.super_block().free_blocks_count, 0);
        assert_accounted(&fs);
    }

    #[test]
    fn insert_without_inodes() {
        let mut fs = fs(8192);
        for i in 0..26 {
            fs.insert(ROOT, &[format!("f{i}").as_str()], true, false).unwrap();
        }
        assert_eq!(fs.super_block().free_inodes_count, 0);

        // 根目录的13个块都已满，但 inode 先不够
        let before = fs.super_block().clone();
        assert!(matches!(
            fs.insert(ROOT, &["extra"], true, false),
            Err(Error::OutOfSpace)
        ));
        assert_eq!(fs.super_block().free_blocks_count, before.free_blocks_count);
        assert_eq!(fs.data_blocks(&fs.inode(ROOT).unwrap()).unwrap().len(), 13);
        assert_accounted(&fs);
    }
}
