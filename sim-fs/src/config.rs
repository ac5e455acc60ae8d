use vfs::{Error, Result};

pub const TOTAL_BLOCKS: usize = 1024;
pub const INODE_COUNT: usize = 256;
/// 块缓存个数的上限
pub const CACHE_CAPACITY: usize = 16;
/// 日志环的槽位数
pub const JOURNAL_CAPACITY: usize = 100;
pub const MAX_OPEN_FILES: usize = 100;

/// 文件系统的几何参数与各类表的容量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    pub total_blocks: usize,
    pub inode_count: usize,
    pub cache_capacity: usize,
    pub journal_capacity: usize,
    pub max_open_files: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            total_blocks: TOTAL_BLOCKS,
            inode_count: INODE_COUNT,
            cache_capacity: CACHE_CAPACITY,
            journal_capacity: JOURNAL_CAPACITY,
            max_open_files: MAX_OPEN_FILES,
        }
    }
}

impl FsConfig {
    pub fn validate(&self) -> Result<()> {
        let tables_empty = self.total_blocks == 0
            || self.inode_count == 0
            || self.journal_capacity == 0
            || self.max_open_files == 0;
        // 缓存必须小于块总数，否则替换策略形同虚设
        let cache_invalid = self.cache_capacity == 0 || self.cache_capacity >= self.total_blocks;
        let too_large = self.total_blocks > u32::MAX as usize || self.inode_count > u32::MAX as usize;

        if tables_empty || cache_invalid || too_large {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}
