//! # 打开文件表
//!
//! 文件描述符把一个打开的文件绑定到它的 inode 与读写游标上；
//! 游标只随读写前移，不支持重新定位。

use alloc::vec::Vec;

use derive_more::{Display, From, Into};
use vfs::{Error, Result};

use crate::NodeId;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct Fd(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFile {
    pub inode: u32,
    /// 打开时对应的文件节点，用于在重命名后找回路径
    pub node: NodeId,
    /// **文件**内的偏移量
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct OpenFileTable {
    slots: Vec<Option<OpenFile>>,
}

impl OpenFileTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// 占用第一个空槽，游标从文件头开始
    pub fn open(&mut self, inode: u32, node: NodeId) -> Result<Fd> {
        let (fd, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(Error::TooManyOpenFiles)?;

        *slot = Some(OpenFile {
            inode,
            node,
            offset: 0,
        });
        Ok(Fd(fd))
    }

    /// 关闭未打开的描述符只会报错
    pub fn close(&mut self, fd: Fd) -> Result<OpenFile> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::take)
            .ok_or(Error::BadDescriptor)
    }

    #[inline]
    pub fn get(&self, fd: Fd) -> Result<&OpenFile> {
        self.slots
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::BadDescriptor)
    }

    #[inline]
    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::BadDescriptor)
    }

    /// 是否有描述符引用该 inode
    pub fn is_open(&self, inode: u32) -> bool {
        self.slots.iter().flatten().any(|file| file.inode == inode)
    }

    /// 已打开的描述符个数
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
