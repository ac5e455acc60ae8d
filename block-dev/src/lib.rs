//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 模拟文件系统中的块设备只存在于内存，但文件系统并不关心这一点。

#![no_std]

use core::any::Any;

/// 块设备驱动特质
///
/// `buf` 的长度必须恰为 [`BlockDevice::block_size`]。
pub trait BlockDevice: Send + Sync + Any {
    /// 每块的字节数
    fn block_size(&self) -> usize;

    /// 设备的总块数
    fn num_blocks(&self) -> usize;

    fn read_block(&self, block_id: usize, buf: &mut [u8]);

    fn write_block(&self, block_id: usize, buf: &[u8]);
}
