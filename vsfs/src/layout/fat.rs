use alloc::vec;
use alloc::vec::Vec;
use core::slice;

use crate::layout::FAT_CAPACITY;
use crate::{Error, Result};

/// FAT 槽位：每个数据块对应一条，记录该块的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct FatSlot(i32);

impl FatSlot {
    /// 未分配
    pub const FREE: Self = Self(-1);

    /// 已分配，且为链表末块
    pub const EOF: Self = Self(-2);

    #[inline]
    pub const fn next(block: u32) -> Self {
        Self(block as i32)
    }

    /// 解读一条已分配槽位。
    /// `Ok(None)` 表示链表到此为止；
    /// 读到未分配槽位说明链表断裂，按布局损坏处理。
    pub fn chase(self) -> Result<Option<u32>> {
        match self {
            Self::EOF => Ok(None),
            Self::FREE => Err(Error::CorruptLayout),
            Self(n) if n >= 0 && (n as usize) < FAT_CAPACITY => Ok(Some(n as u32)),
            _ => Err(Error::CorruptLayout),
        }
    }
}

/// 内存中的 FAT 表，兼任空闲块分配器
#[derive(Debug)]
pub struct Fat {
    slots: Vec<FatSlot>,
    /// 数据区实际可用的块数，分配只在此范围内进行
    usable: usize,
}

impl Fat {
    pub fn empty(usable: usize) -> Self {
        Self {
            slots: vec![FatSlot::FREE; FAT_CAPACITY],
            usable,
        }
    }

    pub fn from_bytes(bytes: &[u8], usable: usize) -> Self {
        assert_eq!(bytes.len(), FAT_CAPACITY * core::mem::size_of::<FatSlot>());
        let slots = bytes
            .chunks_exact(4)
            .map(|raw| FatSlot(i32::from_le_bytes(raw.try_into().unwrap())))
            .collect();
        Self { slots, usable }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            slice::from_raw_parts(
                self.slots.as_ptr().cast(),
                self.slots.len() * core::mem::size_of::<FatSlot>(),
            )
        }
    }

    /// 首次适应分配：从0号槽位起线性扫描第一个空闲块，
    /// 标记为链表末块并返回编号。扫不到即磁盘已满。
    pub fn alloc(&mut self) -> Option<u32> {
        let free = self.slots[..self.usable]
            .iter()
            .position(|&slot| slot == FatSlot::FREE)?;
        self.slots[free] = FatSlot::EOF;
        Some(free as u32)
    }

    /// 把新分配的块挂到链表末块之后
    pub fn link(&mut self, tail: u32, next: u32) {
        debug_assert_eq!(self.slots[tail as usize], FatSlot::EOF);
        debug_assert_eq!(self.slots[next as usize], FatSlot::EOF);
        self.slots[tail as usize] = FatSlot::next(next);
    }

    /// 回退一次挂链：`block` 重归空闲，`tail` 重新成为末块。
    /// 只用于 `block` 尚无有效数据的失败路径。
    pub fn unlink(&mut self, tail: u32, block: u32) {
        debug_assert_eq!(self.slots[tail as usize], FatSlot::next(block));
        self.slots[tail as usize] = FatSlot::EOF;
        self.slots[block as usize] = FatSlot::FREE;
    }

    /// 获取`block`在链表上的下一块
    pub fn next(&self, block: u32) -> Result<Option<u32>> {
        self.get(block)?.chase()
    }

    /// 沿链表走到末块
    pub fn tail(&self, start: u32) -> Result<u32> {
        let mut block = start;
        for _ in 0..self.usable {
            match self.next(block)? {
                Some(next) => block = next,
                None => return Ok(block),
            }
        }
        // 步数超过可用块数，链表必有环
        Err(Error::CorruptLayout)
    }

    /// 链表长度（块数）
    pub fn chain_len(&self, start: u32) -> Result<usize> {
        let mut len = 1;
        let mut block = start;
        while let Some(next) = self.next(block)? {
            block = next;
            len += 1;
            if len > self.usable {
                return Err(Error::CorruptLayout);
            }
        }
        Ok(len)
    }

    /// 释放整条链表，返回被释放的块编号，供上层擦除数据块
    pub fn free_chain(&mut self, start: u32) -> Result<Vec<u32>> {
        let mut freed = Vec::new();
        let mut block = start;
        loop {
            let slot = self.get(block)?;
            self.slots[block as usize] = FatSlot::FREE;
            freed.push(block);
            match slot.chase()? {
                Some(next) => block = next,
                None => return Ok(freed),
            }
            if freed.len() > self.usable {
                return Err(Error::CorruptLayout);
            }
        }
    }

    /// 空闲槽位数
    pub fn free_slots(&self) -> usize {
        self.slots[..self.usable]
            .iter()
            .filter(|&&slot| slot == FatSlot::FREE)
            .count()
    }

    fn get(&self, block: u32) -> Result<FatSlot> {
        self.slots
            .get(block as usize)
            .copied()
            .ok_or(Error::CorruptLayout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_first_fit() {
        let mut fat = Fat::empty(8);
        assert_eq!(fat.alloc(), Some(0));
        assert_eq!(fat.alloc(), Some(1));
        assert_eq!(fat.alloc(), Some(2));

        let freed = fat.free_chain(1).unwrap();
        assert_eq!(freed, [1]);
        // 被释放的槽位下次优先复用
        assert_eq!(fat.alloc(), Some(1));
    }

    #[test]
    fn alloc_respects_usable_bound() {
        let mut fat = Fat::empty(2);
        assert_eq!(fat.alloc(), Some(0));
        assert_eq!(fat.alloc(), Some(1));
        assert_eq!(fat.alloc(), None);
        assert_eq!(fat.free_slots(), 0);
    }

    #[test]
    fn chain_walks_to_eof() {
        let mut fat = Fat::empty(8);
        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        let c = fat.alloc().unwrap();
        fat.link(a, b);
        fat.link(b, c);

        assert_eq!(fat.next(a), Ok(Some(b)));
        assert_eq!(fat.tail(a), Ok(c));
        assert_eq!(fat.chain_len(a), Ok(3));

        let freed = fat.free_chain(a).unwrap();
        assert_eq!(freed, [a, b, c]);
        assert_eq!(fat.free_slots(), 8);
    }

    #[test]
    fn unlink_reverts_a_link() {
        let mut fat = Fat::empty(8);
        let a = fat.alloc().unwrap();
        let b = fat.alloc().unwrap();
        fat.link(a, b);
        fat.unlink(a, b);

        assert_eq!(fat.tail(a), Ok(a));
        assert_eq!(fat.chain_len(a), Ok(1));
        // 被退回的块可以再次分配
        assert_eq!(fat.alloc(), Some(b));
    }

    #[test]
    fn broken_chain_is_corrupt() {
        let fat = Fat::empty(8);
        // 从未分配的槽位出发
        assert_eq!(fat.next(0), Err(Error::CorruptLayout));
    }

    #[test]
    fn cyclic_chain_is_corrupt() {
        // 0 -> 1 -> 0 的环，只可能来自损坏的镜像
        let mut bytes = vec![0u8; FAT_CAPACITY * 4];
        bytes[..4].copy_from_slice(&1i32.to_le_bytes());
        bytes[4..8].copy_from_slice(&0i32.to_le_bytes());
        for chunk in bytes[8..].chunks_exact_mut(4) {
            chunk.copy_from_slice(&(-1i32).to_le_bytes());
        }

        let fat = Fat::from_bytes(&bytes, 8);
        assert_eq!(fat.tail(0), Err(Error::CorruptLayout));
        assert_eq!(fat.chain_len(0), Err(Error::CorruptLayout));
        assert_eq!(Fat::from_bytes(&bytes, 8).free_chain(0).unwrap_err(), Error::CorruptLayout);
    }
}
