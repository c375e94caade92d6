use binrw::binrw;
use byte_store::{Record, decode_name};

use super::{EBR_SIZE, Fit, NAME_LEN, Status};

/// Extended Boot Record 扩展引导记录
///
/// 扩展分区首字节处永远是链表头；
/// 位于偏移`o`的已用节点占据`[o, o + EBR_SIZE + size)`。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ebr {
    pub mount: Status,

    pub fit: Fit,

    /// 逻辑分区数据首字节，空链表头为-1
    pub start: i64,

    pub size: i64,

    /// 下一个EBR的绝对偏移，-1表示链尾
    pub next: i64,

    pub name: [u8; NAME_LEN],
}

impl Ebr {
    /// 不描述任何逻辑分区的链表头
    pub fn empty(fit: Fit) -> Self {
        Self {
            mount: Status::Unused,
            fit,
            start: -1,
            size: 0,
            next: -1,
            name: [0; NAME_LEN],
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == -1
    }

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }
}

impl Record for Ebr {
    const SIZE: usize = EBR_SIZE as usize;
}
