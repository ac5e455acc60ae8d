//! # 块缓存层
//!
//! 在内存中开辟定长的缓冲区，把即将操作的块复制进来，
//! 对块的读写**一定在缓冲区当中**进行。
//!
//! 缓冲区满时按 LRU 选出最久未使用的块：若为脏块则先写回，再装入新块。
//! 与块设备同步并不会移除块缓存，移除只发生在替换时。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use log::trace;

use crate::{DataBlock, BLOCK_SIZE};

/// 内存中的块缓存
pub struct BlockCache {
    /// 缓存的数据
    data: DataBlock,
    /// 对应的块ID
    block_id: usize,
    /// 底层块设备的引用
    block_device: Arc<dyn BlockDevice>,
    /// 是否为脏块
    modified: bool,
    /// 最近一次被访问时的时钟
    last_used: u64,
}

impl BlockCache {
    fn new(block_id: usize, block_device: Arc<dyn BlockDevice>, now: u64) -> Self {
        let mut data = [0; BLOCK_SIZE];
        block_device.read_block(block_id, &mut data);

        Self {
            data,
            block_id,
            block_device,
            modified: false,
            last_used: now,
        }
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_block(self.block_id, &self.data);
        }
    }

    #[inline]
    pub fn data(&self) -> &DataBlock {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut DataBlock {
        self.modified = true;
        &mut self.data
    }

    #[inline]
    pub fn map<V>(&self, f: impl FnOnce(&DataBlock) -> V) -> V {
        f(self.data())
    }

    #[inline]
    pub fn map_mut<V>(&mut self, f: impl FnOnce(&mut DataBlock) -> V) -> V {
        f(self.data_mut())
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.modified
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync();
    }
}

/// 缓存命中与替换的计数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// 替换时写回的脏块数
    pub write_backs: u64,
}

/// 缓存、调度块缓存
pub struct BlockCacheManager {
    queue: Vec<BlockCache>,
    /// 块缓存个数的上限
    capacity: usize,
    /// 每次访问递增，用于 LRU
    clock: u64,
    block_device: Arc<dyn BlockDevice>,
    stats: CacheStats,
}

impl BlockCacheManager {
    pub fn new(block_device: Arc<dyn BlockDevice>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: Vec::with_capacity(capacity),
            capacity,
            clock: 0,
            block_device,
            stats: CacheStats::default(),
        }
    }

    // 块缓存调度策略：踢走最久未使用的块
    pub fn get(&mut self, block_id: usize) -> &mut BlockCache {
        self.clock += 1;
        let now = self.clock;

        // 尝试从缓冲区中读取块
        if let Some(index) = self.queue.iter().position(|cache| cache.block_id == block_id) {
            self.stats.hits += 1;
            let cache = &mut self.queue[index];
            cache.last_used = now;
            return cache;
        }
        self.stats.misses += 1;

        // 尚有空槽
        if self.queue.len() < self.capacity {
            let cache = BlockCache::new(block_id, self.block_device.clone(), now);
            self.queue.push(cache);
            let last = self.queue.len() - 1;
            return &mut self.queue[last];
        }

        // 触及上限，写回并替换最久未使用的块
        let index = self
            .queue
            .iter()
            .enumerate()
            .min_by_key(|(_, cache)| cache.last_used)
            .map(|(index, _)| index)
            .unwrap_or_default();
        let victim = &mut self.queue[index];
        trace!(
            "evict block {} (dirty: {}) for block {block_id}",
            victim.block_id,
            victim.modified
        );
        if victim.modified {
            self.stats.write_backs += 1;
        }
        victim.sync();
        self.stats.evictions += 1;

        self.queue[index] = BlockCache::new(block_id, self.block_device.clone(), now);
        &mut self.queue[index]
    }

    /// 整块覆盖并标记为脏块
    #[inline]
    pub fn put(&mut self, block_id: usize, data: &DataBlock) {
        self.get(block_id).map_mut(|block| block.copy_from_slice(data));
    }

    /// 写回全部脏块
    pub fn flush_all(&mut self) {
        self.queue.iter_mut().for_each(BlockCache::sync);
    }

    #[cfg(test)]
    fn contains(&self, block_id: usize) -> bool {
        self.queue.iter().any(|cache| cache.block_id == block_id)
    }

    /// 当前的脏块个数
    pub fn dirty(&self) -> usize {
        self.queue.iter().filter(|cache| cache.is_dirty()).count()
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
