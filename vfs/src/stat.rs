use enumflags2::BitFlags;

use crate::{DirEntryType, Permission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub mode: DirEntryType,
    /// 文件对应的 inode，目录没有
    pub inode: Option<u32>,
    pub perm: BitFlags<Permission>,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// File size
    pub size: u64,
    /// 创建、修改、访问时刻（逻辑时钟）
    pub ctime: u64,
    pub mtime: u64,
    pub atime: u64,
}
