/* ext2 的整体架构，自上而下 */

// 路径解析
mod path;

// 目录树与文件内容：在 inode 之上实现查找、插入与读写
mod dir;
mod file;

// 间接指针树的遍历与扩展
mod indirect;

// 磁盘块管理器层：超级块、位图与记录的分配
mod efs;

// 磁盘数据结构层
pub mod layout;

pub use self::{efs::FileSystem, indirect::NewBlock, path::split_path};

pub const MAGIC: i32 = 0xEF53;
pub const FS_TYPE: i32 = 2;

pub const SUPER_BLOCK_SIZE: usize = 92;
pub const INODE_SIZE: usize = 100;
pub const BLOCK_SIZE: usize = 64;

/// inode 的块指针数
pub const POINTER_COUNT: usize = 15;
/// 直接块指针数
pub const DIRECT_COUNT: usize = 12;
/// 指针块容纳的块编号数
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;
/// 目录块的槽数
pub const FOLDER_SLOTS: usize = 4;
/// 目录项名字宽度
pub const NAME_LEN: usize = 12;

/// 根目录的 inode 编号
pub const ROOT: u32 = 0;
/// 空指针
pub const NULL: i32 = -1;
