//! # 命令执行
//!
//! 命令之间相互独立：某条命令失败只记入错误列表，不影响后续命令。

use core::fmt;
use std::sync::Arc;

use byte_store::ByteStore;
use ext2::{FileSystem, ROOT, split_path};
use partition::Session;

use crate::command::Command;
use crate::error::Result;

/// 批量执行的结果，成功与失败各自成表
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub results: Vec<String>,
    pub errors: Vec<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, lines) in [("Results:", &self.results), ("Errors:", &self.errors)] {
            if lines.is_empty() {
                continue;
            }
            writeln!(f, "{title}")?;
            for line in lines {
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}

pub struct Shell {
    session: Session,
}

impl Shell {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 逐行执行脚本
    pub fn run(&self, script: &str) -> Report {
        let mut report = Report::default();

        for line in script.lines() {
            let name = line.split_whitespace().next().unwrap_or_default().to_ascii_lowercase();
            match Command::parse(line).and_then(|command| command.map(|c| self.execute(c)).transpose()) {
                Ok(Some(result)) => report.results.push(result),
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{name} rejected: {err}");
                    report.errors.push(format!("{name}: {err}"));
                }
            }
        }

        report
    }

    /// 执行一条命令，返回一行结果
    pub fn execute(&self, command: Command) -> Result<String> {
        let session = &self.session;

        let result = match command {
            Command::MkDisk { size, fit, path } => {
                session.create_disk(&path, size as i64, fit)?;
                format!("disk {} created with {size} bytes", path.display())
            }
            Command::RmDisk { path } => {
                session.delete_disk(&path)?;
                format!("disk {} removed", path.display())
            }
            Command::FDisk {
                size,
                path,
                kind,
                fit,
                name,
            } => {
                let start = session.create_partition(&path, kind, fit, size as i64, &name)?;
                format!("partition {name} ({kind}) created at byte {start} with {size} bytes")
            }
            Command::FDiskDelete { path, name } => {
                session.delete_partition(&path, &name)?;
                format!("partition {name} deleted")
            }
            Command::Mount { path, name } => {
                let id = session.mount(&path, &name)?;
                // 未格式化的分区没有超级块可记
                if let Err(err) = self.with_fs(&id, |fs| fs.record_mount()) {
                    log::debug!("{id} mounted without filesystem stamp: {err}");
                }
                format!("partition {name} mounted as {id}")
            }
            Command::Unmount { id } => {
                if let Err(err) = self.with_fs(&id, |fs| fs.record_unmount()) {
                    log::debug!("{id} unmounted without filesystem stamp: {err}");
                }
                session.unmount(&id)?;
                format!("{id} unmounted")
            }
            Command::Mounted => {
                let mounted = session.mounted();
                if mounted.is_empty() {
                    "no mounted partitions".to_owned()
                } else {
                    mounted
                        .iter()
                        .map(|(id, path)| format!("{id} -> {}", path.display()))
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            }
            Command::MkFs { id } => {
                let (inodes, blocks) = session.with_mounted(&id, |part, disk| {
                    let store: Arc<dyn ByteStore> = Arc::new(disk.clone());
                    let fs = FileSystem::format(store, part.start as u64, part.size as u64)?;
                    let sb = fs.super_block();
                    Ok((sb.inodes_count, sb.blocks_count))
                })?;
                format!("{id} formatted with {inodes} inodes and {blocks} blocks")
            }
            Command::MkDir { id, path, parents } => {
                self.with_fs(&id, |fs| fs.insert(ROOT, &split_path(&path), false, parents))?;
                format!("directory {path} created")
            }
            Command::MkFile {
                id,
                path,
                parents,
                size,
                content,
            } => {
                let content = match (content, size) {
                    (Some(content), _) => content.into_bytes(),
                    (None, Some(size)) => digits(size as usize),
                    (None, None) => Vec::new(),
                };
                self.with_fs(&id, |fs| {
                    let file = fs.insert(ROOT, &split_path(&path), true, parents)?;
                    fs.write_file(file, &content)
                })?;
                format!("file {path} created with {} bytes", content.len())
            }
            Command::Cat { id, file } => {
                let content = self.with_fs(&id, |fs| {
                    let index = fs.resolve(ROOT, &split_path(&file))?;
                    fs.read_file(index)
                })?;
                String::from_utf8_lossy(&content).into_owned()
            }
            Command::Ls { id, path } => {
                let entries = self.with_fs(&id, |fs| {
                    let index = fs.resolve(ROOT, &split_path(&path))?;
                    fs.read_dir(index)
                })?;
                entries
                    .iter()
                    .map(|entry| {
                        if entry.ty.is_dir() {
                            format!("{}/", entry.name)
                        } else {
                            entry.name.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            }
        };
        log::info!("{result}");

        Ok(result)
    }

    /// 打开挂载分区上的文件系统并执行`f`
    fn with_fs<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut FileSystem) -> vfs::Result<T>,
    ) -> vfs::Result<T> {
        self.session.with_mounted(id, |part, disk| {
            let store: Arc<dyn ByteStore> = Arc::new(disk.clone());
            let mut fs = FileSystem::open(store, part.start as u64)?;
            f(&mut fs)
        })
    }
}

/// `0123456789`循环填满`len`字节
fn digits(len: usize) -> Vec<u8> {
    b"0123456789".iter().copied().cycle().take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_fill() {
        assert_eq!(digits(12), b"012345678901");
        assert!(digits(0).is_empty());
    }

    #[test]
    fn report_layout() {
        let report = Report {
            results: vec!["a".to_owned(), "b".to_owned()],
            errors: vec!["mount: not found: x".to_owned()],
        };
        assert_eq!(report.to_string(), "Results:\na\nb\nErrors:\nmount: not found: x\n");
        assert_eq!(Report::default().to_string(), "");
    }
}
