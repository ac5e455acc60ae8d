//! # 内存数据结构层
//!
//! 模拟文件系统的元数据不落盘，块设备上只有数据块：
//! 超级块 | 数据块位图 | inode 表 都常驻内存。

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, InodeTable};
