#![allow(dead_code)]

use std::sync::Arc;

use enumflags2::BitFlags;
use sim_fs::{FsConfig, Permission, RamDisk, SimFileSystem};

pub fn fs() -> SimFileSystem {
    fs_with(FsConfig::default())
}

pub fn fs_with(config: FsConfig) -> SimFileSystem {
    SimFileSystem::format(Arc::new(RamDisk::new(config.total_blocks)), config).unwrap()
}

pub fn small(total_blocks: usize) -> FsConfig {
    FsConfig {
        total_blocks,
        cache_capacity: 2,
        ..Default::default()
    }
}

pub fn rw() -> BitFlags<Permission> {
    Permission::Read | Permission::Write
}

/// 新建空文件并写入内容
pub fn file(fs: &mut SimFileSystem, path: &str, data: &[u8]) -> u32 {
    let inode = fs.create(path, 0, rw()).unwrap();
    assert_eq!(data.len(), fs.write_file(path, data).unwrap());
    inode
}
