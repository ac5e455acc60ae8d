//! 一个完全位于内存的模拟文件系统。
//!
//! 块设备、位图分配器、inode 表、LRU 块缓存、预写日志与目录树
//! 全部由 [`SimFileSystem`] 这一个上下文对象持有。

#![no_std]

extern crate alloc;

/* 模拟文件系统的整体架构，自上而下 */

// 文件操作层：创建、删除、打开、读写、重命名
mod fs;

// 崩溃恢复：启动时重放日志
mod recovery;

// 打开文件表：文件描述符与游标
mod file;

// 命名空间层：目录树与路径解析
mod namespace;

// 日志层：记录每一次修改意图的环形日志
mod journal;

// 块缓存层：内存上的块数据缓存，LRU 替换
mod block_cache;

// 块存储层：数据块与分配位图
mod store;

// 内存数据结构层：超级块、位图、inode
mod layout;

mod config;
mod ram_disk;

pub use self::{
    block_cache::CacheStats,
    config::FsConfig,
    file::Fd,
    fs::SimFileSystem,
    journal::{Journal, JournalRecord},
    layout::SuperBlock,
    namespace::{Namespace, Node, NodeId, NodeKind, Walk, WalkEntry},
    ram_disk::RamDisk,
    recovery::RecoveryReport,
};
pub use block_dev::BlockDevice;
pub use vfs::{DirEntry, DirEntryType, Error, Permission, Result, Stat};

pub const BLOCK_SIZE: usize = 64;
/// 每个 inode 的直接索引个数，也是单个文件的块数上限
pub const DIRECT_COUNT: usize = 12;
pub const MAX_FILE_SIZE: usize = DIRECT_COUNT * BLOCK_SIZE;
/// 单个名字的最大长度
pub const NAME_MAX_LEN: usize = 255;

pub type DataBlock = [u8; BLOCK_SIZE];
