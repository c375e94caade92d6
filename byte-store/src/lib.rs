//! # 字节存储层
//!
//! 磁盘镜像只是一个扁平文件，上层的所有结构都以**绝对字节偏移**定位；
//! [`ByteStore`] 就是对这种按偏移读写的抽象，本层不解释任何数据。
//!
//! 定长记录的编解码见 [`Record`]。

mod disk_file;
mod mem;
mod name;
mod record;

use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

pub use self::{
    disk_file::DiskFile,
    mem::MemStore,
    name::{decode_name, encode_name},
    record::{Record, read_record, write_record},
};

/// Chunk used when zero-filling large regions.
const ZERO_CHUNK: usize = 1024 * 1024;

/// Fixed-offset binary storage.
pub trait ByteStore: Send + Sync {
    /// Total bytes of the store, fixed at creation.
    fn len(&self) -> io::Result<u64>;

    /// Fills `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `buf` starting at `offset`; never grows the store.
    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Overwrites `[offset, offset + len)` with zeros.
pub fn zero_fill(store: &dyn ByteStore, offset: u64, len: u64) -> io::Result<()> {
    let zeros = vec![0; ZERO_CHUNK.min(len as usize)];
    let mut written = 0;
    while written < len {
        let chunk = (len - written).min(ZERO_CHUNK as u64) as usize;
        store.write_at(offset + written, &zeros[..chunk])?;
        written += chunk as u64;
    }

    Ok(())
}

/// Current time in unix seconds, the timestamp unit of every record.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
