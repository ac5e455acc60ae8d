//! # 文件操作层
//!
//! [`SimFileSystem`] 是外部调用者唯一的入口：解析路径、检查权限，
//! 所有块读写都经过块缓存，每一次修改都先追加到日志。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use enumflags2::BitFlags;
use log::{debug, info, warn};
use vfs::{DirEntry, DirEntryType, Error, Permission, Result, Stat};

use crate::block_cache::{BlockCacheManager, CacheStats};
use crate::file::{Fd, OpenFileTable};
use crate::journal::{Journal, JournalRecord};
use crate::layout::{DiskInode, InodeTable, SuperBlock};
use crate::namespace::{self, Namespace, NodeId, Walk};
use crate::store::BlockStore;
use crate::{DataBlock, FsConfig, BLOCK_SIZE, DIRECT_COUNT};

pub struct SimFileSystem {
    pub(crate) config: FsConfig,
    pub(crate) sb: SuperBlock,
    pub(crate) store: BlockStore,
    pub(crate) inodes: InodeTable,
    pub(crate) cache: BlockCacheManager,
    pub(crate) journal: Journal,
    pub(crate) namespace: Namespace,
    pub(crate) files: OpenFileTable,
    /// 逻辑时钟，提供 inode 的时间戳
    clock: u64,
    /// 重放日志时不再重复记录
    pub(crate) replaying: bool,
}

impl SimFileSystem {
    /// 在块设备上建立全新的文件系统：清零所有块，只留根目录
    pub fn format(block_device: Arc<dyn BlockDevice>, config: FsConfig) -> Result<Self> {
        config.validate()?;
        let store = BlockStore::new(block_device.clone(), config.total_blocks)?;
        store.format();

        info!(
            "format: {} blocks x {BLOCK_SIZE} bytes, {} inodes, cache {}, journal {}",
            config.total_blocks, config.inode_count, config.cache_capacity, config.journal_capacity,
        );

        Ok(Self {
            config,
            sb: SuperBlock::new(config.total_blocks as u32, config.inode_count as u32),
            store,
            inodes: InodeTable::new(config.inode_count),
            cache: BlockCacheManager::new(block_device, config.cache_capacity),
            journal: Journal::new(config.journal_capacity),
            namespace: Namespace::new(),
            files: OpenFileTable::new(config.max_open_files),
            clock: 0,
            replaying: false,
        })
    }

    /// 正常卸载：写回缓存
    pub fn unmount(mut self) {
        if !self.files.is_empty() {
            warn!("unmount: {} descriptors still open", self.files.len());
        }
        self.flush();
        info!("unmount: {:?}", self.sb);
    }

    /// 丢弃文件系统，只交出日志，模拟异常关机。
    ///
    /// 缓存析构时仍会把脏块写回旧设备；恢复总是从一块清零的设备开始，
    /// 不依赖旧设备上的任何内容。
    pub fn into_journal(self) -> Journal {
        self.journal
    }

    /// 在 `path` 处创建文件，并为 `size` 字节预先分配块，返回 inode 编号
    pub fn create(&mut self, path: &str, size: usize, perm: BitFlags<Permission>) -> Result<u32> {
        let (parent_path, name) = namespace::split_path(path)?;
        let parent = self.resolve(parent_path)?;
        self.namespace.check_insert(parent, name)?;

        let blocks_needed = DiskInode::count_data_block(size);
        if blocks_needed > DIRECT_COUNT {
            return Err(Error::FileTooLarge);
        }
        if (self.sb.free_blocks as usize) < blocks_needed {
            return Err(Error::NoFreeBlocks);
        }
        if self.sb.free_inodes == 0 {
            return Err(Error::NoFreeInodes);
        }

        self.record(JournalRecord::Create {
            path: namespace::normalize(path),
            size: size as u32,
            perm: perm.bits(),
        })?;

        let mut blocks = Vec::with_capacity(blocks_needed);
        for _ in 0..blocks_needed {
            match self.store.alloc(&mut self.sb) {
                Some(block_id) => blocks.push(block_id),
                None => {
                    for block_id in blocks {
                        self.store.dealloc(&mut self.sb, block_id);
                    }
                    return Err(Error::NoFreeBlocks);
                }
            }
        }

        let now = self.tick();
        let inode_id = match self.inodes.alloc(&mut self.sb, perm, now) {
            Ok(inode_id) => inode_id,
            Err(err) => {
                for block_id in blocks {
                    self.store.dealloc(&mut self.sb, block_id);
                }
                return Err(err);
            }
        };
        if let Some(inode) = self.inodes.get_mut(inode_id) {
            for (block_index, block_id) in blocks.into_iter().enumerate() {
                inode.bind(block_index, block_id)?;
            }
            inode.size = size as u32;
        }

        if let Err(err) = self
            .namespace
            .create_file_node(name, parent, inode_id, perm)
        {
            self.release(inode_id);
            return Err(err);
        }

        debug!("create {path:?}: inode {inode_id}, {blocks_needed} blocks");
        Ok(inode_id)
    }

    pub fn create_dir(&mut self, path: &str) -> Result<()> {
        let (parent_path, name) = namespace::split_path(path)?;
        let parent = self.resolve(parent_path)?;
        self.namespace.check_insert(parent, name)?;

        self.record(JournalRecord::MakeDir {
            path: namespace::normalize(path),
        })?;
        self.namespace.create_directory(name, parent)?;

        debug!("mkdir {path:?}");
        Ok(())
    }

    /// 删除文件，或后序删除整棵目录子树；回收其中所有 inode 与块
    pub fn delete(&mut self, path: &str) -> Result<()> {
        let id = self.resolve(path)?;
        if id == self.namespace.root() {
            return Err(Error::InvalidPath);
        }
        if self
            .namespace
            .subtree_inodes(id)
            .any(|inode| self.files.is_open(inode))
        {
            return Err(Error::Busy);
        }

        self.record(JournalRecord::Delete {
            path: namespace::normalize(path),
        })?;

        let Self {
            namespace,
            inodes,
            store,
            sb,
            cache,
            ..
        } = self;
        let mut released = 0;
        namespace.remove_subtree(id, |node| {
            if let Some(inode_id) = node.inode() {
                release_inode(inodes, store, sb, cache, inode_id);
                released += 1;
            }
        })?;

        debug!("delete {path:?}: {released} inodes released");
        Ok(())
    }

    pub fn open(&mut self, path: &str) -> Result<Fd> {
        let id = self.resolve(path)?;
        let inode_id = self.node_inode(id)?;
        let fd = self.files.open(inode_id, id)?;

        let now = self.tick();
        if let Some(inode) = self.inodes.get_mut(inode_id) {
            inode.atime = now;
        }
        Ok(fd)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files.close(fd).map(drop)
    }

    /// 从游标处读出至多 `buf.len()` 字节，到达文件末尾时返回的字节数会更少
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let file = *self.files.get(fd)?;
        let inode = self.inodes.get(file.inode).ok_or(Error::BadDescriptor)?;
        if !inode.allows(Permission::Read) {
            return Err(Error::PermissionDenied);
        }
        let blocks = inode.block_map();

        let mut start = file.offset;
        let end = (start + buf.len()).min(inode.size as usize);
        // 已读取多少字节
        let mut read_size = 0;
        while start < end {
            let block_index = start / BLOCK_SIZE;
            // 当前块的末地址(字节)
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;
            let block_id = blocks[block_index].ok_or(Error::Inconsistent)?;

            let dest = &mut buf[read_size..read_size + block_read_size];
            self.cache.get(block_id as usize).map(|data_block| {
                // 绝对地址 % 块大小 = 块内偏移
                let src = &data_block[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
                dest.copy_from_slice(src);
            });

            read_size += block_read_size;
            start = current_block_end;
        }

        self.files.get_mut(fd)?.offset = start.max(file.offset);
        let now = self.tick();
        if let Some(inode) = self.inodes.get_mut(file.inode) {
            inode.atime = now;
        }
        Ok(read_size)
    }

    /// 从游标处写入 `buf`，按需为未分配的逻辑块分配数据块。
    ///
    /// 块耗尽或达到单文件上限时写入提前结束，已写入的字节不会回滚：
    /// 返回值小于 `buf.len()` 即表示数据被截断。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let file = *self.files.get(fd)?;
        let inode = self.inodes.get(file.inode).ok_or(Error::BadDescriptor)?;
        if !inode.allows(Permission::Write) {
            return Err(Error::PermissionDenied);
        }
        let old_size = inode.size;
        let old_blocks = inode.block_map();

        let mut offset = file.offset;
        let mut written_size = 0;
        while written_size < buf.len() {
            let block_index = offset / BLOCK_SIZE;
            if block_index >= DIRECT_COUNT {
                warn!("partial write to inode {}: file size cap reached", file.inode);
                break;
            }

            let block_id = match self.block_of(file.inode, block_index) {
                Some(block_id) => block_id,
                None => {
                    let Some(block_id) = self.store.alloc(&mut self.sb) else {
                        warn!("partial write to inode {}: no free blocks", file.inode);
                        break;
                    };
                    self.inode_mut(file.inode)?.bind(block_index, block_id)?;
                    block_id
                }
            };

            let block_offset = offset % BLOCK_SIZE;
            let block_write_size = (BLOCK_SIZE - block_offset).min(buf.len() - written_size);
            let mut data: DataBlock = *self.cache.get(block_id as usize).data();
            data[block_offset..block_offset + block_write_size]
                .copy_from_slice(&buf[written_size..written_size + block_write_size]);
            self.put_block(block_id, &data)?;

            written_size += block_write_size;
            offset += block_write_size;

            let inode = self.inode_mut(file.inode)?;
            if offset > inode.size as usize {
                inode.size = offset as u32;
            }
        }

        self.files.get_mut(fd)?.offset = offset;
        let now = self.tick();
        let inode = self.inode_mut(file.inode)?;
        inode.mtime = now;
        let (size, blocks) = (inode.size, inode.block_map());

        if size != old_size || blocks != old_blocks {
            self.record(JournalRecord::Extend {
                path: self.normalized_path(file.node),
                size,
                blocks: blocks.to_vec(),
            })?;
        }
        Ok(written_size)
    }

    /// 重命名或移动文件（也可以是目录），inode 绑定保持不变
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let id = self.resolve(old)?;
        if self.namespace.lookup(new).is_some() {
            return Err(Error::AlreadyExists);
        }
        let (parent_path, name) = namespace::split_path(new)?;
        let parent = self.resolve(parent_path)?;
        self.namespace.check_move(id, parent, name)?;

        self.record(JournalRecord::Rename {
            old: namespace::normalize(old),
            new: namespace::normalize(new),
        })?;
        self.namespace.rename(id, parent, name)?;

        debug!("rename {old:?} -> {new:?}");
        Ok(())
    }

    /// 目录原地改名，只修改名字
    pub fn rename_directory(&mut self, path: &str, name: &str) -> Result<()> {
        let id = self.resolve(path)?;
        let node = self.namespace.node(id).ok_or(Error::NotFound)?;
        if !node.is_dir() {
            return Err(Error::NotADirectory);
        }
        let parent = node.parent().ok_or(Error::InvalidPath)?;
        self.namespace.check_move(id, parent, name)?;

        self.record(JournalRecord::RenameDir {
            path: namespace::normalize(path),
            name: String::from(name),
        })?;
        self.namespace.rename(id, parent, name)?;

        debug!("rename directory {path:?} -> {name:?}");
        Ok(())
    }

    /// 设置文件或目录的权限
    pub fn set_permissions(&mut self, path: &str, perm: BitFlags<Permission>) -> Result<()> {
        let id = self.resolve(path)?;
        self.record(JournalRecord::Chmod {
            path: namespace::normalize(path),
            perm: perm.bits(),
        })?;

        self.namespace.set_perm(id, perm)?;
        if let Some(inode_id) = self.namespace.node(id).and_then(|node| node.inode()) {
            self.inode_mut(inode_id)?.perm = perm;
        }
        Ok(())
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        let id = self.resolve(path)?;
        let node = self.namespace.node(id).ok_or(Error::NotFound)?;

        let Some(inode_id) = node.inode() else {
            return Ok(Stat {
                mode: DirEntryType::Directory,
                inode: None,
                perm: node.perm(),
                block_size: BLOCK_SIZE as u64,
                blocks: 0,
                size: 0,
                ctime: 0,
                mtime: 0,
                atime: 0,
            });
        };

        let inode = self.inodes.get(inode_id).ok_or(Error::Inconsistent)?;
        Ok(Stat {
            mode: inode.kind,
            inode: Some(inode_id),
            perm: inode.perm,
            block_size: BLOCK_SIZE as u64,
            blocks: inode.blocks().count() as u64,
            size: inode.size as u64,
            ctime: inode.ctime,
            mtime: inode.mtime,
            atime: inode.atime,
        })
    }

    /// 目录的直接子项
    pub fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let id = self.resolve(path)?;
        let node = self.namespace.node(id).ok_or(Error::NotFound)?;
        if !node.is_dir() {
            return Err(Error::NotADirectory);
        }

        Ok(node
            .children()
            .iter()
            .filter_map(|&child| self.namespace.node(child))
            .map(|child| child.dir_entry())
            .collect())
    }

    /// 深度优先遍历 `path` 下的全部后代
    pub fn walk(&self, path: &str) -> Result<Walk<'_>> {
        let id = self.resolve(path)?;
        Ok(self.namespace.walk(id))
    }

    /// 名字包含 `term` 的所有项的绝对路径
    pub fn search(&self, term: &str) -> Vec<String> {
        self.namespace
            .search(self.namespace.root(), term)
            .map(|entry| self.namespace.path_of(entry.id))
            .collect()
    }

    /// 子树内所有文件大小之和
    pub fn directory_size(&self, path: &str) -> Result<u64> {
        let id = self.resolve(path)?;
        Ok(self
            .namespace
            .subtree_inodes(id)
            .filter_map(|inode_id| self.inodes.get(inode_id))
            .map(|inode| inode.size as u64)
            .sum())
    }

    /// 打开、读出全部内容、关闭
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let size = self.stat(path)?.size as usize;
        let fd = self.open(path)?;
        let mut buf = vec![0; size];
        let read = self.read(fd, &mut buf);
        self.close(fd)?;

        buf.truncate(read?);
        Ok(buf)
    }

    /// 打开、从头写入、关闭
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<usize> {
        let fd = self.open(path)?;
        let written = self.write(fd, data);
        self.close(fd)?;
        written
    }

    /// 经由缓存读出一整块
    pub fn read_block(&mut self, block_id: u32) -> Result<DataBlock> {
        if block_id as usize >= self.store.total_blocks() {
            return Err(Error::NotFound);
        }
        Ok(*self.cache.get(block_id as usize).data())
    }

    /// 写回缓存中的全部脏块
    pub fn flush(&mut self) {
        self.cache.flush_all();
    }

    /// 核对超级块、位图、inode 表与目录树之间的不变式
    pub fn check(&self) -> Result<()> {
        let mut owned = 0;
        let mut seen = crate::layout::Bitmap::new(self.store.total_blocks());
        for inode in self.inodes.iter() {
            if inode.blocks().count() != DiskInode::count_data_block(inode.size as usize) {
                warn!("check: inode {} holds a wrong number of blocks", inode.id);
                return Err(Error::Inconsistent);
            }
            for block_id in inode.blocks() {
                if !self.store.is_allocated(block_id) || !seen.claim(block_id) {
                    warn!("check: block {block_id} of inode {} is not owned exclusively", inode.id);
                    return Err(Error::Inconsistent);
                }
                owned += 1;
            }
        }

        let live_inodes = self.inodes.iter().count() as u32;
        let file_nodes = self.namespace.subtree_inodes(self.namespace.root()).count() as u32;
        if self.sb.free_blocks != self.sb.total_blocks - owned
            || self.store.allocated() as u32 != owned
            || self.sb.free_inodes != self.sb.total_inodes - live_inodes
            || file_nodes != live_inodes
        {
            warn!("check: counters disagree: {:?}, {owned} owned blocks", self.sb);
            return Err(Error::Inconsistent);
        }
        Ok(())
    }

    #[inline]
    pub fn super_block(&self) -> SuperBlock {
        self.sb
    }

    #[inline]
    pub fn config(&self) -> FsConfig {
        self.config
    }

    #[inline]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    #[inline]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[inline]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 缓存中尚未写回的块数
    #[inline]
    pub fn dirty_blocks(&self) -> usize {
        self.cache.dirty()
    }

    #[inline]
    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        self.store.block_device()
    }
}

impl SimFileSystem {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub(crate) fn resolve(&self, path: &str) -> Result<NodeId> {
        self.namespace.lookup(path).ok_or(Error::NotFound)
    }

    fn node_inode(&self, id: NodeId) -> Result<u32> {
        let node = self.namespace.node(id).ok_or(Error::NotFound)?;
        node.inode().ok_or(Error::IsADirectory)
    }

    pub(crate) fn inode_mut(&mut self, inode_id: u32) -> Result<&mut DiskInode> {
        self.inodes.get_mut(inode_id).ok_or(Error::Inconsistent)
    }

    fn block_of(&self, inode_id: u32, block_index: usize) -> Option<u32> {
        self.inodes.get(inode_id)?.block_id(block_index)
    }

    fn normalized_path(&self, node: NodeId) -> String {
        namespace::normalize(&self.namespace.path_of(node))
    }

    /// 追加日志；重放期间不记录
    pub(crate) fn record(&mut self, record: JournalRecord) -> Result<()> {
        if self.replaying {
            return Ok(());
        }
        self.journal.append(&record)
    }

    /// 整块写入缓存并记一条写日志
    fn put_block(&mut self, block_id: u32, data: &DataBlock) -> Result<()> {
        self.record(JournalRecord::Write {
            block_id,
            data: data.to_vec(),
        })?;
        self.cache.put(block_id as usize, data);
        Ok(())
    }

    fn release(&mut self, inode_id: u32) {
        release_inode(
            &mut self.inodes,
            &mut self.store,
            &mut self.sb,
            &mut self.cache,
            inode_id,
        );
    }
}

/// 释放 inode 及其全部数据块；回收的块经由缓存清零
fn release_inode(
    inodes: &mut InodeTable,
    store: &mut BlockStore,
    sb: &mut SuperBlock,
    cache: &mut BlockCacheManager,
    inode_id: u32,
) {
    let Some(mut inode) = inodes.free(sb, inode_id) else {
        warn!("release: inode {inode_id} is already free");
        return;
    };
    for block_id in inode.clear() {
        cache
            .get(block_id as usize)
            .map_mut(|data_block| data_block.fill(0));
        store.dealloc(sb, block_id);
    }
}
