use alloc::vec;
use alloc::vec::Vec;

/// 位图，记录其指示区域的块分配情况：1 为占用，0 为空闲
#[derive(Debug, Clone)]
pub struct Bitmap {
    groups: Vec<u64>,
    /// 位图所指示区域的总块数
    capacity: usize,
}

/// 块在位图内的编号
struct BlockID(u32);

impl Bitmap {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 首次适配：按编号升序寻找第一个空闲位，置位并返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<u32> {
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != u64::MAX).then_some((group_index, bits.trailing_ones() as usize))
                })?;

        let id = BlockID::encode(group_index, ingroup_index);
        // 最后一组的尾部可能超出容量
        if id.0 as usize >= self.capacity {
            return None;
        }

        self.groups[group_index] |= 1 << ingroup_index;
        Some(id.0)
    }

    pub fn dealloc(&mut self, id: u32) {
        let (group_index, ingroup_index) = BlockID(id).decode();

        // 编号一定得有对应的位
        debug_assert_ne!(self.groups[group_index] & (1 << ingroup_index), 0);

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    /// 占用指定的位，返回此前是否空闲
    pub fn claim(&mut self, id: u32) -> bool {
        let (group_index, ingroup_index) = BlockID(id).decode();
        let was_free = self.groups[group_index] & (1 << ingroup_index) == 0;
        self.groups[group_index] |= 1 << ingroup_index;
        was_free
    }

    #[inline]
    pub fn is_set(&self, id: u32) -> bool {
        let (group_index, ingroup_index) = BlockID(id).decode();
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    /// 已占用的位数
    pub fn count_ones(&self) -> usize {
        self.groups.iter().map(|bits| bits.count_ones() as usize).sum()
    }
}

impl BlockID {
    #[inline]
    fn encode(group_index: usize, ingroup_index: usize) -> Self {
        Self((group_index * 64 + ingroup_index) as u32)
    }

    #[inline]
    fn decode(self) -> (usize, usize) {
        let id = self.0 as usize;
        (id / 64, id % 64)
    }
}
