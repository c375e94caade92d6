use core::fmt;
use core::str::FromStr;

use binrw::binrw;
use byte_store::{Record, decode_name};
use vfs::Error;

use super::{ID_LEN, MBR_SIZE, NAME_LEN, PARTITION_SIZE};

/// Master Boot Record 主引导记录
/// 位于磁盘的第0字节。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone)]
pub struct Mbr {
    /// 磁盘字节数
    pub size: i64,

    /// 创建时间（unix秒）
    pub created: i64,

    /// 随机签名
    pub signature: u32,

    pub fit: Fit,

    pub partitions: [Partition; 4],
}

impl Mbr {
    pub fn new(size: i64, created: i64, signature: u32, fit: Fit) -> Self {
        Self {
            size,
            created,
            signature,
            fit,
            partitions: [Partition::FREE; 4],
        }
    }

    pub fn extended(&self) -> Option<(usize, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .find(|(_, part)| !part.is_free() && part.kind == PartType::Extended)
    }

    /// Used entry with the given name.
    pub fn find(&self, name: &str) -> Option<(usize, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .find(|(_, part)| !part.is_free() && part.name() == name)
    }

    pub fn find_by_id(&self, id: &str) -> Option<(usize, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .find(|(_, part)| !part.is_free() && part.id() == id)
    }

    /// `[start, end)` of every used entry.
    pub fn used_ranges(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.partitions
            .iter()
            .filter(|part| !part.is_free())
            .map(|part| (part.start, part.start + part.size))
    }
}

impl Record for Mbr {
    const SIZE: usize = MBR_SIZE as usize;
}

/// 分区表项
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub status: Status,

    pub kind: PartType,

    pub fit: Fit,

    /// 分区首字节的绝对偏移，-1表示空闲表项
    pub start: i64,

    pub size: i64,

    pub name: [u8; NAME_LEN],

    /// 表项序号（从1开始），空闲时为-1
    pub correlative: i32,

    /// 挂载ID，未挂载时全为NUL
    pub id: [u8; ID_LEN],
}

impl Partition {
    pub const FREE: Self = Self {
        status: Status::Unused,
        kind: PartType::Primary,
        fit: Fit::Worst,
        start: -1,
        size: -1,
        name: [0; NAME_LEN],
        correlative: -1,
        id: [0; ID_LEN],
    };

    #[inline]
    pub fn is_free(&self) -> bool {
        self.start == -1
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.status == Status::Mounted
    }

    pub fn name(&self) -> String {
        decode_name(&self.name)
    }

    pub fn id(&self) -> String {
        decode_name(&self.id)
    }
}

impl Record for Partition {
    const SIZE: usize = PARTITION_SIZE as usize;
}

#[binrw]
#[brw(repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Unused = b'0',
    Mounted = b'1',
}

#[binrw]
#[brw(repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PartType {
    Primary = b'P',
    Extended = b'E',
    Logical = b'L',
}

impl FromStr for PartType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "P" => Ok(Self::Primary),
            "E" => Ok(Self::Extended),
            "L" => Ok(Self::Logical),
            _ => Err(Error::InvalidPartitionType(s.to_owned())),
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8 as char)
    }
}

/// 空闲空间的选取策略
#[binrw]
#[brw(repr = u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Fit {
    #[default]
    First = b'F',
    Best = b'B',
    Worst = b'W',
}

impl Fit {
    /// Accepts the command spelling `FF`/`BF`/`WF` as well as the stored letter.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "FF" | "F" => Some(Self::First),
            "BF" | "B" => Some(Self::Best),
            "WF" | "W" => Some(Self::Worst),
            _ => None,
        }
    }
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}F", *self as u8 as char)
    }
}
