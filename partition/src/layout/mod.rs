//! 分区表的磁盘布局
//!
//! ```text
//! 0        MBR_SIZE                                   disk size
//! ┌───────┬───────────┬─────────────────────────┬─────┐
//! │  MBR  │ primary   │ extended                │ ... │
//! │       │           │ ┌─────┬──────┬─────┬───┐│     │
//! │       │           │ │ EBR │ data │ EBR │...││     │
//! └───────┴───────────┴─┴─────┴──────┴─────┴───┴┴─────┘
//! ```

mod ebr;
mod mbr;

pub use self::{
    ebr::Ebr,
    mbr::{Fit, Mbr, PartType, Partition, Status},
};

pub const MBR_SIZE: u64 = 209;
pub const PARTITION_SIZE: u64 = 47;
pub const EBR_SIZE: u64 = 42;

/// 分区名字段宽度
pub const NAME_LEN: usize = 16;
/// 挂载ID字段宽度
pub const ID_LEN: usize = 8;
