use crate::BLOCK_SIZE;

/// 超级块：记录块与 inode 的总量和余量。
///
/// 每次分配或释放块、inode 都会同步修改这里的计数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub block_size: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
}

impl SuperBlock {
    #[inline]
    pub fn new(total_blocks: u32, total_inodes: u32) -> Self {
        Self {
            total_blocks,
            free_blocks: total_blocks,
            block_size: BLOCK_SIZE as u32,
            total_inodes,
            free_inodes: total_inodes,
        }
    }

    #[inline]
    pub fn used_blocks(&self) -> u32 {
        self.total_blocks - self.free_blocks
    }

    #[inline]
    pub fn used_inodes(&self) -> u32 {
        self.total_inodes - self.free_inodes
    }
}
