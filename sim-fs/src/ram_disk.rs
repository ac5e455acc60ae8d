use alloc::boxed::Box;
use alloc::vec;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::BLOCK_SIZE;

/// 以一整块堆内存模拟的块设备
pub struct RamDisk {
    blocks: Mutex<Box<[u8]>>,
    num_blocks: usize,
}

impl RamDisk {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![0; num_blocks * BLOCK_SIZE].into_boxed_slice()),
            num_blocks,
        }
    }
}

impl BlockDevice for RamDisk {
    #[inline]
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    #[inline]
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        assert!(block_id < self.num_blocks, "block {block_id} out of device");
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&self.blocks.lock()[start..start + BLOCK_SIZE]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        assert!(block_id < self.num_blocks, "block {block_id} out of device");
        let start = block_id * BLOCK_SIZE;
        self.blocks.lock()[start..start + BLOCK_SIZE].copy_from_slice(buf);
    }
}
