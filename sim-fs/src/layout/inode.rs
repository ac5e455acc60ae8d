//! inode 只使用直接索引：至多 [`DIRECT_COUNT`] 个块编号，
//! 因此单个文件不超过 [`MAX_FILE_SIZE`](crate::MAX_FILE_SIZE) 字节。

use alloc::vec::Vec;

use enumflags2::BitFlags;
use vfs::{DirEntryType, Error, Permission, Result};

use super::SuperBlock;
use crate::{BLOCK_SIZE, DIRECT_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInode {
    /// ID
    pub id: u32,
    pub size: u32,
    /// 类型
    pub kind: DirEntryType,
    pub perm: BitFlags<Permission>,
    /// 创建时刻
    pub ctime: u64,
    /// 修改时刻
    pub mtime: u64,
    /// 访问时刻
    pub atime: u64,
    /// 直接索引块，空表示该逻辑块尚未分配
    direct: [Option<u32>; DIRECT_COUNT],
}

impl DiskInode {
    #[inline]
    pub fn new(id: u32, perm: BitFlags<Permission>, now: u64) -> Self {
        Self {
            id,
            size: 0,
            kind: DirEntryType::Regular,
            perm,
            ctime: now,
            mtime: now,
            atime: now,
            direct: [None; DIRECT_COUNT],
        }
    }

    /// 逻辑块索引 -> 块编号
    #[inline]
    pub fn block_id(&self, block_index: usize) -> Option<u32> {
        self.direct.get(block_index).copied().flatten()
    }

    #[inline]
    pub fn block_map(&self) -> [Option<u32>; DIRECT_COUNT] {
        self.direct
    }

    /// 把块绑定到逻辑索引上，索引越界说明文件已达上限
    pub fn bind(&mut self, block_index: usize, block_id: u32) -> Result<()> {
        let slot = self.direct.get_mut(block_index).ok_or(Error::FileTooLarge)?;
        debug_assert!(slot.is_none());
        *slot = Some(block_id);
        Ok(())
    }

    /// 已分配的块
    pub fn blocks(&self) -> impl Iterator<Item = u32> + '_ {
        self.direct.iter().flatten().copied()
    }

    #[inline]
    pub fn allows(&self, perm: Permission) -> bool {
        self.perm.contains(perm)
    }

    /// 清空 inode，返回需要回收的块
    pub fn clear(&mut self) -> Vec<u32> {
        let drop_data_blocks = self.blocks().collect();
        self.direct.fill(None);
        self.size = 0;
        drop_data_blocks
    }

    /// 计算容纳指定数据量需要多少个**数据块**
    #[inline]
    pub fn count_data_block(size: usize) -> usize {
        size.div_ceil(BLOCK_SIZE)
    }
}

/// 定长 inode 表，空槽表示空闲 inode
#[derive(Debug, Clone)]
pub struct InodeTable {
    slots: Vec<Option<DiskInode>>,
}

impl InodeTable {
    pub fn new(count: usize) -> Self {
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || None);
        Self { slots }
    }

    /// 在第一个空槽上分配 inode
    pub fn alloc(
        &mut self,
        sb: &mut SuperBlock,
        perm: BitFlags<Permission>,
        now: u64,
    ) -> Result<u32> {
        let (id, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(Error::NoFreeInodes)?;

        *slot = Some(DiskInode::new(id as u32, perm, now));
        sb.free_inodes -= 1;
        Ok(id as u32)
    }

    /// 释放 inode 并交出其内容，由调用者回收数据块
    pub fn free(&mut self, sb: &mut SuperBlock, id: u32) -> Option<DiskInode> {
        let inode = self.slots.get_mut(id as usize)?.take()?;
        sb.free_inodes += 1;
        Some(inode)
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&DiskInode> {
        self.slots.get(id as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: u32) -> Option<&mut DiskInode> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    /// 所有存活的 inode
    pub fn iter(&self) -> impl Iterator<Item = &DiskInode> {
        self.slots.iter().flatten()
    }
}
