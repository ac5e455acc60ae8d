//! # 崩溃恢复
//!
//! 在全新格式化的文件系统上按时间先后重放日志。重放是幂等的：
//! 失败的记录只记一条警告后跳过，无法解码的记录单独汇报。

use alloc::collections::BTreeSet;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use enumflags2::BitFlags;
use log::{info, warn};
use vfs::{Error, Result};

use crate::journal::{Journal, JournalRecord};
use crate::{DataBlock, FsConfig, SimFileSystem, BLOCK_SIZE, DIRECT_COUNT};

/// 一次重放的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// 成功重放的记录数
    pub replayed: usize,
    /// 重放失败而被跳过的记录数
    pub skipped: usize,
    /// 无法解码的记录所在的槽位
    pub malformed: Vec<usize>,
}

impl SimFileSystem {
    /// 清零块设备，重放 `journal` 后交出文件系统。
    ///
    /// 被重放的记录不会再次写入日志，`journal` 本身成为新文件系统的日志。
    pub fn mount(
        block_device: Arc<dyn BlockDevice>,
        config: FsConfig,
        journal: Journal,
    ) -> Result<(Self, RecoveryReport)> {
        let mut fs = Self::format(block_device, config)?;

        fs.replaying = true;
        let mut written = BTreeSet::new();
        let report = fs.replay(&journal, &mut written);
        fs.replaying = false;

        // 日志回绕后，写记录可能落在最终无人持有的块上
        for block_id in written {
            if !fs.store.is_allocated(block_id) {
                fs.cache.put(block_id as usize, &[0; BLOCK_SIZE]);
            }
        }

        fs.journal = journal;
        fs.flush();

        info!(
            "recovery: {} replayed, {} skipped, {} malformed",
            report.replayed,
            report.skipped,
            report.malformed.len()
        );
        Ok((fs, report))
    }

    fn replay(&mut self, journal: &Journal, written: &mut BTreeSet<u32>) -> RecoveryReport {
        let mut report = RecoveryReport::default();
        for (index, bytes) in journal.iter() {
            let record = match JournalRecord::decode(bytes) {
                Ok(record) => record,
                Err(_) => {
                    warn!("recovery: journal[{index}] is malformed");
                    report.malformed.push(index);
                    continue;
                }
            };

            match self.apply(&record) {
                Ok(()) => {
                    if let JournalRecord::Write { block_id, .. } = &record {
                        written.insert(*block_id);
                    }
                    report.replayed += 1;
                }
                Err(err) => {
                    warn!("recovery: journal[{index}] {} skipped: {err}", record.kind());
                    report.skipped += 1;
                }
            }
        }
        report
    }

    fn apply(&mut self, record: &JournalRecord) -> Result<()> {
        match record {
            JournalRecord::Write { block_id, data } => {
                let block: DataBlock = data
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::MalformedJournal)?;
                if *block_id as usize >= self.store.total_blocks() {
                    return Err(Error::NotFound);
                }
                self.cache.put(*block_id as usize, &block);
                Ok(())
            }
            JournalRecord::Create { path, size, perm } => self
                .create(path, *size as usize, BitFlags::from_bits_truncate(*perm))
                .map(drop),
            JournalRecord::Delete { path } => self.delete(path),
            JournalRecord::Rename { old, new } => self.rename(old, new),
            JournalRecord::MakeDir { path } => self.create_dir(path),
            JournalRecord::RenameDir { path, name } => self.rename_directory(path, name),
            JournalRecord::Chmod { path, perm } => {
                self.set_permissions(path, BitFlags::from_bits_truncate(*perm))
            }
            JournalRecord::Extend { path, size, blocks } => self.rebind(path, *size, blocks),
        }
    }

    /// 把写入时懒分配的块重新绑定到文件上
    fn rebind(&mut self, path: &str, size: u32, blocks: &[Option<u32>]) -> Result<()> {
        let id = self.resolve(path)?;
        let inode_id = self
            .namespace
            .node(id)
            .and_then(|node| node.inode())
            .ok_or(Error::IsADirectory)?;
        // 先整体校验，再动位图
        let out_of_range = blocks
            .iter()
            .flatten()
            .any(|&block_id| block_id as usize >= self.store.total_blocks());
        if blocks.len() > DIRECT_COUNT
            || out_of_range
            || size as usize > blocks.len() * BLOCK_SIZE
        {
            return Err(Error::MalformedJournal);
        }

        for (block_index, &recorded) in blocks.iter().enumerate() {
            let Some(block_id) = recorded else {
                continue;
            };
            match self.inode_mut(inode_id)?.block_id(block_index) {
                None => {
                    if !self.store.claim(&mut self.sb, block_id) {
                        warn!("recovery: block {block_id} is owned by another file");
                        continue;
                    }
                    self.inode_mut(inode_id)?.bind(block_index, block_id)?;
                }
                Some(bound) if bound != block_id => {
                    warn!("recovery: {path:?}[{block_index}] is bound to block {bound}, not {block_id}");
                }
                Some(_) => {}
            }
        }

        let inode = self.inode_mut(inode_id)?;
        let covered = inode.blocks().count() * BLOCK_SIZE;
        inode.size = size.min(covered as u32);
        Ok(())
    }
}
