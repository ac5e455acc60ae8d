//! # 日志层
//!
//! 每个被接受的修改（块写入、创建、删除、重命名……）在生效前
//! 都会以一条记录追加到日志中。日志是定长的环：写满后新记录
//! 静默覆盖最旧的记录，所以崩溃后最多只能恢复最近
//! [`Journal::capacity`] 次修改。
//!
//! 记录以 postcard 编码后存放，解码失败的记录即为损坏的日志项。

use alloc::string::String;
use alloc::vec::Vec;

use log::trace;
use serde::{Deserialize, Serialize};
use vfs::{Error, Result};

/// 一次修改意图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalRecord {
    /// 整块写入
    Write { block_id: u32, data: Vec<u8> },
    Create { path: String, size: u32, perm: u8 },
    /// 删除文件或整棵子树
    Delete { path: String },
    Rename { old: String, new: String },
    MakeDir { path: String },
    /// 目录原地改名
    RenameDir { path: String, name: String },
    Chmod { path: String, perm: u8 },
    /// 写入后文件的大小与块映射
    Extend {
        path: String,
        size: u32,
        blocks: Vec<Option<u32>>,
    },
}

impl JournalRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::MalformedJournal)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|_| Error::MalformedJournal)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Create { .. } => "create",
            Self::Delete { .. } => "delete",
            Self::Rename { .. } => "rename",
            Self::MakeDir { .. } => "mkdir",
            Self::RenameDir { .. } => "rename-dir",
            Self::Chmod { .. } => "chmod",
            Self::Extend { .. } => "extend",
        }
    }
}

/// 定长的环形日志
#[derive(Debug, Clone)]
pub struct Journal {
    slots: Vec<Option<Vec<u8>>>,
    /// 下一条记录写入的槽位
    next: usize,
    /// 被覆盖掉的记录数
    overwritten: usize,
}

impl Journal {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            next: 0,
            overwritten: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 有效记录数
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        let bytes = record.encode()?;
        trace!("journal[{}] <- {}", self.next, record.kind());
        self.append_raw(bytes);
        Ok(())
    }

    /// 追加一条已编码的记录，不做任何校验
    pub fn append_raw(&mut self, bytes: Vec<u8>) {
        let slot = &mut self.slots[self.next];
        if slot.is_some() {
            self.overwritten += 1;
        }
        *slot = Some(bytes);
        self.next = (self.next + 1) % self.slots.len();
    }

    /// 按时间先后遍历记录，返回 `(槽位, 编码)`。
    /// 环未写满时即为槽位 0 到末尾的顺序。
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        let capacity = self.slots.len();
        // 下一个槽位已被占用，说明环已回绕，最旧的记录就在那里
        let oldest = if self.slots[self.next].is_some() {
            self.next
        } else {
            0
        };

        (0..capacity)
            .map(move |i| (oldest + i) % capacity)
            .filter_map(|index| self.slots[index].as_deref().map(|bytes| (index, bytes)))
    }

    /// 按时间先后解码全部记录
    pub fn records(&self) -> impl Iterator<Item = Result<JournalRecord>> + '_ {
        self.iter().map(|(_, bytes)| JournalRecord::decode(bytes))
    }
}
