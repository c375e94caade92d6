use std::io;

use spin::Mutex;

use crate::ByteStore;

/// In-memory store, handy for exercising the upper layers without a host file.
#[derive(Debug)]
pub struct MemStore {
    inner: Mutex<Vec<u8>>,
}

impl MemStore {
    pub fn new(size: usize) -> Self {
        Self {
            inner: Mutex::new(vec![0; size]),
        }
    }

    /// Copy of the whole content.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }
}

fn out_of_range(offset: u64, len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("range {offset}+{len} exceeds store"),
    )
}

impl ByteStore for MemStore {
    fn len(&self) -> io::Result<u64> {
        Ok(self.inner.lock().len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let data = self.inner.lock();
        let start = offset as usize;
        let src = data
            .get(start..start + buf.len())
            .ok_or_else(|| out_of_range(offset, buf.len()))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut data = self.inner.lock();
        let start = offset as usize;
        let dest = data
            .get_mut(start..start + buf.len())
            .ok_or_else(|| out_of_range(offset, buf.len()))?;
        dest.copy_from_slice(buf);
        Ok(())
    }
}
