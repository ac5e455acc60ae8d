//! # 块存储层
//!
//! 块设备与数据块位图。块的分配采用首次适配，按编号升序扫描。

use alloc::sync::Arc;

use block_dev::BlockDevice;
use log::trace;
use vfs::{Error, Result};

use crate::layout::{Bitmap, SuperBlock};
use crate::{DataBlock, BLOCK_SIZE};

pub struct BlockStore {
    block_device: Arc<dyn BlockDevice>,
    bitmap: Bitmap,
}

impl BlockStore {
    pub fn new(block_device: Arc<dyn BlockDevice>, total_blocks: usize) -> Result<Self> {
        if block_device.block_size() != BLOCK_SIZE || block_device.num_blocks() < total_blocks {
            return Err(Error::InvalidConfig);
        }

        Ok(Self {
            block_device,
            bitmap: Bitmap::new(total_blocks),
        })
    }

    /// 把所有块清零
    pub fn format(&self) {
        let zero: DataBlock = [0; BLOCK_SIZE];
        for block_id in 0..self.bitmap.capacity() {
            self.block_device.write_block(block_id, &zero);
        }
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        &self.block_device
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.bitmap.capacity()
    }

    /// 分配新的数据块并返回其ID
    pub fn alloc(&mut self, sb: &mut SuperBlock) -> Option<u32> {
        let block_id = self.bitmap.alloc()?;
        sb.free_blocks -= 1;
        trace!("alloc block {block_id}");
        Some(block_id)
    }

    /// 重复释放属于调用者的错误，只在调试构建中检查
    pub fn dealloc(&mut self, sb: &mut SuperBlock, block_id: u32) {
        self.bitmap.dealloc(block_id);
        sb.free_blocks += 1;
        trace!("dealloc block {block_id}");
    }

    /// 占用指定的块，块原本空闲时才计数；返回块原本是否空闲
    pub fn claim(&mut self, sb: &mut SuperBlock, block_id: u32) -> bool {
        if block_id as usize >= self.bitmap.capacity() {
            return false;
        }
        let was_free = self.bitmap.claim(block_id);
        if was_free {
            sb.free_blocks -= 1;
        }
        was_free
    }

    #[inline]
    pub fn is_allocated(&self, block_id: u32) -> bool {
        (block_id as usize) < self.bitmap.capacity() && self.bitmap.is_set(block_id)
    }

    #[inline]
    pub fn allocated(&self) -> usize {
        self.bitmap.count_ones()
    }
}
