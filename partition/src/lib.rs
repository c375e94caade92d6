//! # 磁盘分区层
//!
//! MBR/EBR记录、首次/最佳/最差适配的空闲空间选取，以及挂载会话。

mod fit;
pub mod layout;
mod session;
pub mod table;

pub use self::{
    fit::{Gap, free_gaps},
    layout::{Ebr, Fit, Mbr, PartType, Partition, Status},
    session::{DEFAULT_TENANT, Session},
};
