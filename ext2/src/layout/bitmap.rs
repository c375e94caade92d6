use byte_store::ByteStore;
use vfs::Result;

/// 位图区域，第`i`位（字节`i / 8`的第`i % 8`低位）指示第`i`个记录是否已用
#[derive(Debug, Clone, Copy)]
pub struct Bitmap {
    /// 位图的起始偏移
    start: u64,
    /// 位图所指示的记录数
    items: u32,
}

impl Bitmap {
    #[inline]
    pub fn new(start: u64, items: u32) -> Self {
        Self { start, items }
    }

    /// 位图占用字节数
    #[inline]
    pub fn len(&self) -> u64 {
        self.items.div_ceil(8) as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    #[inline]
    pub fn items(&self) -> u32 {
        self.items
    }

    /// 首个空闲记录的编号，位图用尽时返回空
    pub fn find_free(&self, store: &dyn ByteStore) -> Result<Option<u32>> {
        let mut bytes = vec![0; self.len() as usize];
        store.read_at(self.start, &mut bytes)?;

        Ok(bytes
            .iter()
            .enumerate()
            .find_map(|(byte_index, &bits)| {
                (bits != u8::MAX).then_some(byte_index as u32 * 8 + bits.trailing_ones())
            })
            .filter(|&index| index < self.items))
    }

    pub fn get(&self, store: &dyn ByteStore, index: u32) -> Result<bool> {
        let mut byte = [0];
        store.read_at(self.start + (index / 8) as u64, &mut byte)?;
        Ok(byte[0] & (1 << (index % 8)) != 0)
    }

    /// 置位，返回原先的值
    pub fn set(&self, store: &dyn ByteStore, index: u32) -> Result<bool> {
        let offset = self.start + (index / 8) as u64;
        let mut byte = [0];
        store.read_at(offset, &mut byte)?;

        let mask = 1 << (index % 8);
        let was_set = byte[0] & mask != 0;
        if !was_set {
            byte[0] |= mask;
            store.write_at(offset, &byte)?;
        }

        Ok(was_set)
    }
}
