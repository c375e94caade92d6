//! # 挂载会话
//!
//! 挂载表与每个磁盘的互斥锁都归属于一个 [`Session`]，而非进程全局状态。
//! 持有挂载表锁时绝不获取磁盘锁。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byte_store::{DiskFile, encode_name};
use spin::Mutex;
use vfs::{Error, Result};

use crate::layout::{Fit, ID_LEN, PartType, Partition, Status};
use crate::table;

pub const DEFAULT_TENANT: &str = "39";

/// 盘符`A`到`Z`
const LETTERS: usize = 26;

#[derive(Debug, Default)]
struct MountTable {
    /// 挂载ID -> 磁盘路径
    ids: BTreeMap<String, PathBuf>,
    /// 按首次挂载顺序记录的磁盘，下标决定盘符
    letters: Vec<PathBuf>,
}

impl MountTable {
    /// 磁盘的盘符，首次见到时分配下一个；26个字母用完后拒绝新磁盘
    fn letter(&mut self, path: &Path) -> Result<char> {
        let index = match self.letters.iter().position(|known| known == path) {
            Some(index) => index,
            None if self.letters.len() < LETTERS => {
                self.letters.push(path.to_path_buf());
                self.letters.len() - 1
            }
            None => return Err(Error::NoMountLetter(path.display().to_string())),
        };
        Ok((b'A' + index as u8) as char)
    }
}

#[derive(Debug)]
pub struct Session {
    tenant: String,
    mounts: Mutex<MountTable>,
    disks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT)
    }
}

impl Session {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            mounts: Mutex::new(MountTable::default()),
            disks: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn disk_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.disks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Runs `f` on the disk at `path` while holding that disk's lock.
    pub fn with_disk<T>(&self, path: &Path, f: impl FnOnce(&DiskFile) -> Result<T>) -> Result<T> {
        let path = canonical(path);
        let lock = self.disk_lock(&path);
        let _guard = lock.lock();

        let disk = DiskFile::open(&path).map_err(|_| Error::NotFound(path.display().to_string()))?;
        f(&disk)
    }

    pub fn create_disk(&self, path: &Path, size: i64, fit: Fit) -> Result<()> {
        let path = canonical(path);
        let lock = self.disk_lock(&path);
        let _guard = lock.lock();

        table::create_disk(&path, size, fit)?;
        Ok(())
    }

    /// Removes the image and every mount pointing at it.
    pub fn delete_disk(&self, path: &Path) -> Result<()> {
        let path = canonical(path);
        {
            let lock = self.disk_lock(&path);
            let _guard = lock.lock();
            table::delete_disk(&path)?;
        }

        self.forget_disk(&path);
        Ok(())
    }

    pub fn create_partition(
        &self,
        path: &Path,
        kind: PartType,
        fit: Fit,
        size: i64,
        name: &str,
    ) -> Result<i64> {
        self.with_disk(path, |disk| table::create_partition(disk, kind, fit, size, name))
    }

    /// Deletes a partition unless it is mounted in this session.
    pub fn delete_partition(&self, path: &Path, name: &str) -> Result<()> {
        self.with_disk(path, |disk| {
            let mbr = table::read_mbr(disk)?;
            if let Some((_, part)) = mbr.find(name)
                && part.is_mounted()
                && self.mounts.lock().ids.contains_key(&part.id())
            {
                return Err(Error::Busy(part.id()));
            }

            table::delete_partition(disk, name)
        })
    }

    /// 挂载主分区，返回挂载ID：`<tenant><correlative><letter>`。
    /// 已在本会话挂载的分区直接返回原ID。
    pub fn mount(&self, path: &Path, name: &str) -> Result<String> {
        let path = canonical(path);
        self.with_disk(&path, |disk| {
            let mut mbr = table::read_mbr(disk)?;
            let Some((slot, part)) = mbr.find(name) else {
                let logical = table::logical_partitions(disk, &mbr)?
                    .iter()
                    .any(|ebr| ebr.name() == name);
                return Err(if logical {
                    Error::NotPrimary(name.to_owned())
                } else {
                    Error::NotFound(name.to_owned())
                });
            };
            if part.kind != PartType::Primary {
                return Err(Error::NotPrimary(name.to_owned()));
            }

            let current = part.id();
            if part.is_mounted() && self.mounts.lock().ids.get(&current) == Some(&path) {
                return Ok(current);
            }

            let id = {
                let mut mounts = self.mounts.lock();
                let letter = mounts.letter(&path)?;
                format!("{}{}{letter}", self.tenant, part.correlative)
            };
            let id_field = encode_name::<ID_LEN>(&id)?;

            let entry = &mut mbr.partitions[slot];
            entry.status = Status::Mounted;
            entry.id = id_field;
            table::write_mbr(disk, &mbr)?;

            self.mounts.lock().ids.insert(id.clone(), path.clone());
            log::info!("partition {name} of {path:?} mounted as {id}");
            Ok(id)
        })
    }

    pub fn unmount(&self, id: &str) -> Result<()> {
        let path = self.mounted_path(id)?;
        let result = self.with_disk(&path, |disk| {
            let mut mbr = table::read_mbr(disk)?;
            let Some((slot, _)) = mbr.find_by_id(id) else {
                return Err(Error::NotFound(id.to_owned()));
            };

            let entry = &mut mbr.partitions[slot];
            entry.status = Status::Unused;
            entry.id = [0; ID_LEN];
            table::write_mbr(disk, &mbr)
        });

        self.mounts.lock().ids.remove(id);
        log::info!("{id} unmounted");
        result
    }

    /// Re-reads the MBR and returns the entry carrying mount id `id`.
    pub fn resolve_mounted(&self, id: &str) -> Result<(Partition, PathBuf)> {
        let path = self.mounted_path(id)?;
        let part = self.with_mounted(id, |part, _| Ok(*part))?;
        Ok((part, path))
    }

    /// Runs `f` on a mounted partition while holding its disk's lock.
    pub fn with_mounted<T>(
        &self,
        id: &str,
        f: impl FnOnce(&Partition, &DiskFile) -> Result<T>,
    ) -> Result<T> {
        let path = self.mounted_path(id)?;
        self.with_disk(&path, |disk| {
            let mbr = table::read_mbr(disk)?;
            let (_, part) = mbr
                .find_by_id(id)
                .ok_or_else(|| Error::NotMounted(id.to_owned()))?;
            f(part, disk)
        })
    }

    /// 当前会话的全部挂载，按ID排序
    pub fn mounted(&self) -> Vec<(String, PathBuf)> {
        self.mounts
            .lock()
            .ids
            .iter()
            .map(|(id, path)| (id.clone(), path.clone()))
            .collect()
    }

    /// Drops every mount of the disk at `path`.
    pub fn forget_disk(&self, path: &Path) {
        self.mounts.lock().ids.retain(|_, mounted| mounted != path);
    }

    fn mounted_path(&self, id: &str) -> Result<PathBuf> {
        self.mounts
            .lock()
            .ids
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotMounted(id.to_owned()))
    }
}

/// Stable key for a disk path, whether or not the file exists yet.
fn canonical(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(file)) => parent
            .canonicalize()
            .map(|parent| parent.join(file))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_run_out_after_z() {
        let mut mounts = MountTable::default();
        let disks: Vec<PathBuf> = (0..LETTERS)
            .map(|i| PathBuf::from(format!("/disks/{i}.dsk")))
            .collect();
        let letters: String = disks
            .iter()
            .map(|disk| mounts.letter(disk).unwrap())
            .collect();
        assert_eq!(letters, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");

        assert!(matches!(
            mounts.letter(Path::new("/disks/extra.dsk")),
            Err(Error::NoMountLetter(_))
        ));
        // 已有盘符的磁盘不受影响
        assert_eq!(mounts.letter(&disks[0]).unwrap(), 'A');
        assert_eq!(mounts.letter(&disks[25]).unwrap(), 'Z');
        assert_eq!(mounts.letters.len(), LETTERS);
    }
}
